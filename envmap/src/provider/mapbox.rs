//! Mapbox GL adapter (the fallback provider).
//!
//! Requires a Mapbox access token. Two bundles are loaded: the GL JS
//! script, which is mandatory, and its stylesheet, whose failure is only
//! logged.
//!
//! # Object model
//!
//! - Centers are `[lng, lat]` arrays.
//! - Overlays are a raster source plus a layer drawing it. Ids are unique,
//!   so mounting a second overlay under the same id fails unless the first
//!   was removed.
//! - `load` fires once, after the first frame.
//! - Zoom is measured against 512px tiles.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::native::{
    LiveMaps, MapContainer, MapboxEvent, MapboxMap, MapboxMapOptions, NativeMap, NativeMapError,
    RasterLayer, RasterSource,
};
use super::types::{
    ListenerToken, MapProvider, MapType, ProviderError, ProviderKind, Readiness, StyleOptions,
};
use super::wait_for_render;
use crate::config::Credential;
use crate::events::{self, PointerCallback};
use crate::geo::{Bounds, LatLng, ViewState};
use crate::http::BoxFuture;
use crate::loader::{LoadOutcome, LoadPolicy, ScriptLoader};
use crate::overlay::ResolvedOverlay;

/// Pinned GL JS release.
pub const MAPBOX_GL_VERSION: &str = "v2.15.0";

/// GL JS script bundle.
pub const MAPBOX_GL_JS_URL: &str = "https://api.mapbox.com/mapbox-gl-js/v2.15.0/mapbox-gl.js";

/// GL JS stylesheet.
pub const MAPBOX_GL_CSS_URL: &str = "https://api.mapbox.com/mapbox-gl-js/v2.15.0/mapbox-gl.css";

/// Source and layer id used for the single managed overlay.
pub const OVERLAY_LAYER_ID: &str = "earth-engine-layer";

/// Control added once the map has loaded.
pub const NAVIGATION_CONTROL: &str = "NavigationControl";

/// Default bounded wait for `load`.
pub const MAPBOX_READY_TIMEOUT: Duration = Duration::from_secs(8);

/// Mapbox GL provider adapter.
pub struct MapboxProvider {
    credential: Credential,
    loader: ScriptLoader,
    live: LiveMaps,
    ready_timeout: Duration,
}

impl MapboxProvider {
    pub fn new(credential: Credential, loader: ScriptLoader) -> Self {
        Self {
            credential,
            loader,
            live: LiveMaps::new(),
            ready_timeout: MAPBOX_READY_TIMEOUT,
        }
    }

    pub fn with_ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = timeout;
        self
    }

    pub fn live_maps(&self) -> &LiveMaps {
        &self.live
    }

    fn style_url(style: &StyleOptions) -> String {
        if let Some(url) = &style.style_url {
            return url.clone();
        }
        let name = match style.map_type {
            MapType::Satellite => "satellite-v9",
            MapType::Hybrid => "satellite-streets-v12",
            MapType::Roadmap => "streets-v12",
            MapType::Terrain => "outdoors-v12",
        };
        format!("mapbox://styles/mapbox/{}", name)
    }

    fn unwrap_map<'a>(&self, native: &'a NativeMap) -> Result<&'a MapboxMap, ProviderError> {
        match native {
            NativeMap::Mapbox(map) => Ok(map),
            other => Err(ProviderError::WrongProvider {
                expected: ProviderKind::Fallback,
                actual: other.kind(),
            }),
        }
    }

    fn native_err(source: NativeMapError) -> ProviderError {
        ProviderError::Native {
            provider: ProviderKind::Fallback,
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
            .on(event, move |e| match e {
                MapboxEvent::Click(mouse) | MapboxEvent::MouseMove(mouse) => {
                    callback(events::from_mapbox_event(mouse))
                }
                _ => {}
            })
            .map_err(Self::native_err)?;
        Ok(ListenerToken::Mapbox(id))
    }

    async fn load_stylesheet(&self) {
        match self
            .loader
            .load_with_policy(MAPBOX_GL_CSS_URL, LoadPolicy::FailOpen)
            .await
        {
            Ok(LoadOutcome::Loaded) => debug!("Mapbox GL stylesheet loaded"),
            Ok(LoadOutcome::Degraded(e)) | Err(e) => {
                warn!(error = %e, "Mapbox GL stylesheet unavailable, controls may render unstyled")
            }
        }
    }
}

impl MapProvider for MapboxProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Fallback
    }

    fn name(&self) -> &str {
        "Mapbox"
    }

    fn sdk_urls(&self) -> Vec<String> {
        vec![MAPBOX_GL_JS_URL.to_string(), MAPBOX_GL_CSS_URL.to_string()]
    }

    fn check_credentials(&self) -> Result<(), ProviderError> {
        self.credential
            .validate()
            .map(|_| ())
            .map_err(|e| ProviderError::unavailable(ProviderKind::Fallback, e.to_string()))
    }

    fn load_sdk(&self) -> BoxFuture<'_, Result<(), ProviderError>> {
        Box::pin(async move {
            self.check_credentials()?;

            let (script, _) = futures::join!(
                self.loader.load(MAPBOX_GL_JS_URL),
                self.load_stylesheet()
            );

            let outcome = script
                .map_err(|e| ProviderError::unavailable(ProviderKind::Fallback, e.to_string()))?;
            if let LoadOutcome::Degraded(e) = &outcome {
                debug!(error = %e, "Mapbox GL script load degraded");
            }
            if !self.loader.is_available(MAPBOX_GL_JS_URL) {
                return Err(ProviderError::unavailable(
                    ProviderKind::Fallback,
                    format!(
                        "SDK not available ({})",
                        self.loader.status(MAPBOX_GL_JS_URL)
                    ),
                ));
            }

            info!(
                version = MAPBOX_GL_VERSION,
                token = %self.credential.masked(),
                "Mapbox GL SDK ready"
            );
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
        let token = self
            .credential
            .validate()
            .map_err(|e| ProviderError::unavailable(ProviderKind::Fallback, e.to_string()))?;
        view.validate()?;

        let options = MapboxMapOptions {
            access_token: token.to_string(),
            style: Self::style_url(style),
            center: [view.center.lng, view.center.lat],
            zoom: view.zoom,
        };

        let map = MapboxMap::new(container, options, &self.live)
            .map_err(|e| ProviderError::unavailable(ProviderKind::Fallback, e.to_string()))?;

        debug!(container = container.id(), zoom = view.zoom, "Created Mapbox map");
        Ok(NativeMap::Mapbox(map))
    }

    fn on_ready<'a>(
        &'a self,
        native: &'a NativeMap,
    ) -> BoxFuture<'a, Result<Readiness, ProviderError>> {
        Box::pin(async move {
            let map = self.unwrap_map(native)?;
            let readiness =
                wait_for_render(ProviderKind::Fallback, map.subscribe_render(), self.ready_timeout)
                    .await?;

            match readiness {
                Readiness::Rendered => {
                    if !map.controls().iter().any(|c| c == NAVIGATION_CONTROL) {
                        map.add_control(NAVIGATION_CONTROL)
                            .map_err(Self::native_err)?;
                    }
                }
                Readiness::TimedOut => warn!(
                    timeout_secs = self.ready_timeout.as_secs(),
                    "Mapbox map never fired load, continuing"
                ),
            }
            Ok(readiness)
        })
    }

    fn set_center(&self, native: &NativeMap, center: LatLng) -> Result<(), ProviderError> {
        let map = self.unwrap_map(native)?;
        center.validate()?;
        map.set_center([center.lng, center.lat])
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
            LatLng::new(center.lat, center.lng),
            map.get_zoom(),
        ))
    }

    fn get_bounds(&self, native: &NativeMap) -> Result<Bounds, ProviderError> {
        let map = self.unwrap_map(native)?;
        let [[west, south], [east, north]] = map.get_bounds();
        Ok(Bounds::new(north, south, east, west))
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
        if let ListenerToken::Mapbox(id) = token {
            map.off(id);
        }
        Ok(())
    }

    fn add_overlay(&self, native: &NativeMap, overlay: &ResolvedOverlay) -> Result<(), ProviderError> {
        let map = self.unwrap_map(native)?;
        map.add_source(
            OVERLAY_LAYER_ID,
            RasterSource {
                tiles: vec![overlay.tile_url_template.clone()],
                tile_size: overlay.tile_size,
            },
        )
        .map_err(Self::native_err)?;

        let layer = RasterLayer {
            id: OVERLAY_LAYER_ID.to_string(),
            source: OVERLAY_LAYER_ID.to_string(),
            raster_opacity: overlay.opacity,
            metadata: Some(overlay.name.clone()),
        };
        if let Err(e) = map.add_layer(layer) {
            // Leave no orphaned source behind.
            let _ = map.remove_source(OVERLAY_LAYER_ID);
            return Err(Self::native_err(e));
        }
        Ok(())
    }

    fn clear_overlay(&self, native: &NativeMap) -> Result<(), ProviderError> {
        let map = self.unwrap_map(native)?;
        if map.get_layer(OVERLAY_LAYER_ID).is_some() {
            map.remove_layer(OVERLAY_LAYER_ID)
                .map_err(Self::native_err)?;
        }
        if map.get_source(OVERLAY_LAYER_ID).is_some() {
            map.remove_source(OVERLAY_LAYER_ID)
                .map_err(Self::native_err)?;
        }
        Ok(())
    }

    fn overlay_names(&self, native: &NativeMap) -> Result<Vec<String>, ProviderError> {
        let map = self.unwrap_map(native)?;
        Ok(map
            .layers()
            .into_iter()
            .filter(|layer| layer.source == OVERLAY_LAYER_ID)
            .map(|layer| layer.metadata.unwrap_or(layer.id))
            .collect())
    }

    fn destroy(&self, native: &NativeMap) {
        if let NativeMap::Mapbox(map) = native {
            map.remove();
        }
    }
}
