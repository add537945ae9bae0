//! Map provider abstraction.
//!
//! Two interchangeable SDKs sit behind the [`MapProvider`] trait:
//!
//! | Role                       | Adapter                | SDK          |
//! |----------------------------|------------------------|--------------|
//! | [`ProviderKind::Primary`]  | [`GoogleMapsProvider`] | Google Maps  |
//! | [`ProviderKind::Fallback`] | [`MapboxProvider`]     | Mapbox GL JS |
//!
//! Adapters are the only code that knows each SDK's object model. Everything
//! above them works with [`LatLng`](crate::geo::LatLng),
//! [`Bounds`](crate::geo::Bounds) and [`ResolvedOverlay`](crate::overlay::ResolvedOverlay).

mod google;
mod mapbox;
pub mod native;
mod types;

pub use google::{GoogleMapsProvider, GOOGLE_MAPS_SDK_URL, GOOGLE_READY_TIMEOUT};
pub use mapbox::{
    MapboxProvider, MAPBOX_GL_CSS_URL, MAPBOX_GL_JS_URL, MAPBOX_GL_VERSION, MAPBOX_READY_TIMEOUT,
    NAVIGATION_CONTROL, OVERLAY_LAYER_ID,
};
pub use types::{
    ListenerToken, MapProvider, MapType, ProviderError, ProviderKind, Readiness, StyleOptions,
};

use std::time::Duration;

use tokio::sync::watch;

use native::RenderState;

/// Waits for the first render pass, giving up after `timeout`.
///
/// A map that fails before rendering makes its provider unavailable; a map
/// that stays silent past the deadline is reported as
/// [`Readiness::TimedOut`] and used anyway.
pub(crate) async fn wait_for_render(
    provider: ProviderKind,
    mut render: watch::Receiver<RenderState>,
    timeout: Duration,
) -> Result<Readiness, ProviderError> {
    let wait = async {
        loop {
            let state = render.borrow_and_update().clone();
            match state {
                RenderState::Rendered => return Ok(Readiness::Rendered),
                RenderState::Failed(reason) => {
                    return Err(ProviderError::unavailable(provider, reason));
                }
                RenderState::Pending => {}
            }
            if render.changed().await.is_err() {
                return Err(ProviderError::unavailable(
                    provider,
                    "map dropped before first render",
                ));
            }
        }
    };

    match tokio::time::timeout(timeout, wait).await {
        Ok(result) => result,
        Err(_) => Ok(Readiness::TimedOut),
    }
}
