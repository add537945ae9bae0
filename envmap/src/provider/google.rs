//! Google Maps adapter (the primary provider).
//!
//! Requires a Google Maps Platform API key with the Maps JavaScript API
//! enabled. The SDK bundle is requested as:
//!
//! ```text
//! https://maps.googleapis.com/maps/api/js?key={API_KEY}&libraries=visualization
//! ```
//!
//! # Object model
//!
//! - Centers are `GLatLng` objects read through `lat()`/`lng()`.
//! - `overlayMapTypes` is append-only, so overlays stack unless cleared.
//! - `idle` fires after every render pass; the first one means ready.
//! - Zoom is measured against 256px tiles.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::native::{
    GLatLng, GoogleEvent, GoogleMap, GoogleMapOptions, ImageMapType, LiveMaps, MapContainer,
    NativeMap,
};
use super::types::{
    ListenerToken, MapProvider, MapType, ProviderError, ProviderKind, Readiness, StyleOptions,
};
use super::wait_for_render;
use crate::config::Credential;
use crate::events::{self, PointerCallback};
use crate::geo::{Bounds, LatLng, ViewState};
use crate::http::BoxFuture;
use crate::loader::{LoadOutcome, ScriptLoader};
use crate::overlay::ResolvedOverlay;

/// Base URL of the Maps JavaScript API bundle.
pub const GOOGLE_MAPS_SDK_URL: &str = "https://maps.googleapis.com/maps/api/js";

/// Libraries requested alongside the core SDK.
const GOOGLE_MAPS_LIBRARIES: &str = "visualization";

/// Default bounded wait for the first `idle`.
pub const GOOGLE_READY_TIMEOUT: Duration = Duration::from_secs(8);

/// Google Maps provider adapter.
///
/// # Example
///
/// ```ignore
/// use envmap::config::Credential;
/// use envmap::provider::{GoogleMapsProvider, MapProvider};
///
/// let provider = GoogleMapsProvider::new(
///     Credential::new("primary_key", Some("AIza...".to_string())),
///     loader,
/// );
/// provider.load_sdk().await?;
/// let map = provider.create(&container, &view, &StyleOptions::default())?;
/// ```
pub struct GoogleMapsProvider {
    credential: Credential,
    loader: ScriptLoader,
    live: LiveMaps,
    ready_timeout: Duration,
}

impl GoogleMapsProvider {
    pub fn new(credential: Credential, loader: ScriptLoader) -> Self {
        Self {
            credential,
            loader,
            live: LiveMaps::new(),
            ready_timeout: GOOGLE_READY_TIMEOUT,
        }
    }

    /// Overrides the bounded wait for the first render.
    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    /// Live native maps created by this adapter.
    pub fn live_maps(&self) -> &LiveMaps {
        &self.live
    }

    /// SDK bundle URL for a validated key.
    fn sdk_url_for(key: &str) -> String {
        format!(
            "{}?key={}&libraries={}",
            GOOGLE_MAPS_SDK_URL, key, GOOGLE_MAPS_LIBRARIES
        )
    }

    fn map_type_id(style: &StyleOptions) -> &'static str {
        match style.map_type {
            MapType::Satellite => "satellite",
            MapType::Hybrid => "hybrid",
            MapType::Roadmap => "roadmap",
            MapType::Terrain => "terrain",
        }
    }

    fn unwrap_map<'a>(&self, native: &'a NativeMap) -> Result<&'a GoogleMap, ProviderError> {
        match native {
            NativeMap::Google(map) => Ok(map),
            other => Err(ProviderError::WrongProvider {
                expected: ProviderKind::Primary,
                actual: other.kind(),
            }),
        }
    }

    fn native_err(source: super::native::NativeMapError) -> ProviderError {
        ProviderError::Native {
            provider: ProviderKind::Primary,
            source,
        }
    }

    fn listen(
        &self,
        native: &NativeMap,
        event: &'static str,
        callback: PointerCallback,
    ) -> Result<ListenerToken, ProviderError> {
        let map = self.unwrap_map(native)?;
        let id = map
            .add_listener(event, move |e| match e {
                GoogleEvent::Click(mouse) | GoogleEvent::MouseMove(mouse) => {
                    callback(events::from_google_event(mouse))
                }
                _ => {}
            })
            .map_err(Self::native_err)?;
        Ok(ListenerToken::Google(id))
    }
}

impl MapProvider for GoogleMapsProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Primary
    }

    fn name(&self) -> &str {
        "Google Maps"
    }

    fn sdk_urls(&self) -> Vec<String> {
        match self.credential.validate() {
            Ok(key) => vec![Self::sdk_url_for(key)],
            Err(_) => Vec::new(),
        }
    }

    fn check_credentials(&self) -> Result<(), ProviderError> {
        self.credential
            .validate()
            .map(|_| ())
            .map_err(|e| ProviderError::unavailable(ProviderKind::Primary, e.to_string()))
    }

    fn load_sdk(&self) -> BoxFuture<'_, Result<(), ProviderError>> {
        Box::pin(async move {
            self.check_credentials()?;
            for url in self.sdk_urls() {
                let outcome = self.loader.load(&url).await.map_err(|e| {
                    ProviderError::unavailable(ProviderKind::Primary, e.to_string())
                })?;
                if let LoadOutcome::Degraded(e) = &outcome {
                    debug!(error = %e, "Google Maps SDK load degraded");
                }
                if !self.loader.is_available(&url) {
                    return Err(ProviderError::unavailable(
                        ProviderKind::Primary,
                        format!("SDK not available ({})", self.loader.status(&url)),
                    ));
                }
            }
            info!(key = %self.credential.masked(), "Google Maps SDK ready");
            Ok(())
        })
    }

    fn ready_timeout(&self) -> Duration {
        self.ready_timeout
    }

    fn create(
        &self,
        container: &MapContainer,
        view: &ViewState,
        style: &StyleOptions,
    ) -> Result<NativeMap, ProviderError> {
        self.check_credentials()?;
        view.validate()?;

        let options = GoogleMapOptions {
            center: GLatLng::new(view.center.lat, view.center.lng),
            zoom: view.zoom,
            map_type_id: Self::map_type_id(style).to_string(),
            ..GoogleMapOptions::default()
        };

        let map = GoogleMap::new(container, options, &self.live)
            .map_err(|e| ProviderError::unavailable(ProviderKind::Primary, e.to_string()))?;

        debug!(container = container.id(), zoom = view.zoom, "Created Google map");
        Ok(NativeMap::Google(map))
    }

    fn on_ready<'a>(
        &'a self,
        native: &'a NativeMap,
    ) -> BoxFuture<'a, Result<Readiness, ProviderError>> {
        Box::pin(async move {
            let map = self.unwrap_map(native)?;
            let readiness =
                wait_for_render(ProviderKind::Primary, map.subscribe_render(), self.ready_timeout)
                    .await?;
            if readiness == Readiness::TimedOut {
                warn!(
                    timeout_secs = self.ready_timeout.as_secs(),
                    "Google map never went idle, continuing"
                );
            }
            Ok(readiness)
        })
    }

    fn set_center(&self, native: &NativeMap, center: LatLng) -> Result<(), ProviderError> {
        let map = self.unwrap_map(native)?;
        center.validate()?;
        map.set_center(GLatLng::new(center.lat, center.lng))
            .map_err(Self::native_err)
    }

    fn set_zoom(&self, native: &NativeMap, zoom: f64) -> Result<(), ProviderError> {
        let map = self.unwrap_map(native)?;
        crate::geo::validate_zoom(zoom)?;
        map.set_zoom(zoom).map_err(Self::native_err)
    }

    fn view_state(&self, native: &NativeMap) -> Result<ViewState, ProviderError> {
        let map = self.unwrap_map(native)?;
        let center = map.get_center();
        Ok(ViewState::new(
            LatLng::new(center.lat(), center.lng()),
            map.get_zoom(),
        ))
    }

    fn get_bounds(&self, native: &NativeMap) -> Result<Bounds, ProviderError> {
        let map = self.unwrap_map(native)?;
        let bounds = map.get_bounds();
        let ne = bounds.get_north_east();
        let sw = bounds.get_south_west();
        Ok(Bounds::new(ne.lat(), sw.lat(), ne.lng(), sw.lng()))
    }

    fn on_click(
        &self,
        native: &NativeMap,
        callback: PointerCallback,
    ) -> Result<ListenerToken, ProviderError> {
        self.listen(native, "click", callback)
    }

    fn on_move(
        &self,
        native: &NativeMap,
        callback: PointerCallback,
    ) -> Result<ListenerToken, ProviderError> {
        self.listen(native, "mousemove", callback)
    }

    fn remove_listener(&self, native: &NativeMap, token: ListenerToken) -> Result<(), ProviderError> {
        let map = self.unwrap_map(native)?;
        if let ListenerToken::Google(id) = token {
            map.remove_listener(id);
        }
        Ok(())
    }

    fn add_overlay(&self, native: &NativeMap, overlay: &ResolvedOverlay) -> Result<(), ProviderError> {
        let map = self.unwrap_map(native)?;
        map.push_overlay_map_type(ImageMapType {
            name: overlay.name.clone(),
            tile_size: overlay.tile_size,
            opacity: overlay.opacity,
            tile_url_template: overlay.tile_url_template.clone(),
        })
        .map_err(Self::native_err)
    }

    fn clear_overlay(&self, native: &NativeMap) -> Result<(), ProviderError> {
        let map = self.unwrap_map(native)?;
        map.clear_overlay_map_types();
        Ok(())
    }

    fn overlay_names(&self, native: &NativeMap) -> Result<Vec<String>, ProviderError> {
        let map = self.unwrap_map(native)?;
        Ok(map
            .overlay_map_types()
            .into_iter()
            .map(|o| o.name)
            .collect())
    }

    fn destroy(&self, native: &NativeMap) {
        if let NativeMap::Google(map) = native {
            map.remove();
        }
    }
}
