//! Mapbox-style native map.
//!
//! Centers are `[lng, lat]` arrays, overlays are a pair of a raster source
//! and a layer referencing it, and ids are unique: adding a source or layer
//! whose id is already present is an error rather than a replacement.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

use super::{LiveMaps, LiveToken, MapContainer, NativeMapError, RenderMode, RenderState};
use crate::geo::{self, LatLng, ViewState};

/// Mapbox measures zoom against 512px tiles.
const MAPBOX_TILE_SIZE: u32 = 512;

/// A point with public fields, longitude first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Builds from a `[lng, lat]` array.
    pub fn from_array(coords: [f64; 2]) -> Self {
        Self {
            lng: coords[0],
            lat: coords[1],
        }
    }

    pub fn to_array(&self) -> [f64; 2] {
        [self.lng, self.lat]
    }
}

/// Construction options.
#[derive(Debug, Clone, PartialEq)]
pub struct MapboxMapOptions {
    pub access_token: String,
    pub style: String,
    /// `[lng, lat]`
    pub center: [f64; 2],
    pub zoom: f64,
}

impl Default for MapboxMapOptions {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            style: "mapbox://styles/mapbox/satellite-v9".to_string(),
            center: [36.8219, -1.2921],
            zoom: 8.0,
        }
    }
}

/// A raster tile source.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterSource {
    pub tiles: Vec<String>,
    pub tile_size: u32,
}

/// A raster layer drawing a source.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterLayer {
    pub id: String,
    pub source: String,
    pub raster_opacity: f32,
    /// Free-form data carried with the layer.
    pub metadata: Option<String>,
}

/// Pointer event payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapMouseEvent {
    pub lng_lat: LngLat,
    /// Screen pixel position inside the container.
    pub point: (f64, f64),
}

/// Events dispatched through `on`.
#[derive(Debug, Clone, PartialEq)]
pub enum MapboxEvent {
    Load,
    Click(MapMouseEvent),
    MouseMove(MapMouseEvent),
    Error(String),
}

impl MapboxEvent {
    pub fn name(&self) -> &'static str {
        match self {
            MapboxEvent::Load => "load",
            MapboxEvent::Click(_) => "click",
            MapboxEvent::MouseMove(_) => "mousemove",
            MapboxEvent::Error(_) => "error",
        }
    }
}

/// Handle returned by `on`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type Handler = Arc<dyn Fn(&MapboxEvent) + Send + Sync>;

struct MapboxMapState {
    container_id: String,
    width: u32,
    height: u32,
    center: [f64; 2],
    zoom: f64,
    options: MapboxMapOptions,
    sources: BTreeMap<String, RasterSource>,
    layers: Vec<RasterLayer>,
    controls: Vec<String>,
    handlers: Vec<(HandlerId, String, Handler)>,
    next_handler: u64,
    loaded: bool,
    live: Option<LiveToken>,
}

/// Mapbox-style map instance.
#[derive(Clone)]
pub struct MapboxMap {
    state: Arc<Mutex<MapboxMapState>>,
    render: Arc<watch::Sender<RenderState>>,
}

impl fmt::Debug for MapboxMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MapboxMap")
            .field("container", &state.container_id)
            .field("center", &state.center)
            .field("zoom", &state.zoom)
            .field("layers", &state.layers.len())
            .field("removed", &state.live.is_none())
            .finish()
    }
}

impl MapboxMap {
    /// Creates a map inside `container`.
    pub fn new(
        container: &MapContainer,
        options: MapboxMapOptions,
        live: &LiveMaps,
    ) -> Result<Self, NativeMapError> {
        if !container.is_attached() {
            return Err(NativeMapError::InvalidContainer(container.id().to_string()));
        }

        let (render, _) = watch::channel(RenderState::Pending);
        let map = Self {
            state: Arc::new(Mutex::new(MapboxMapState {
                container_id: container.id().to_string(),
                width: container.width(),
                height: container.height(),
                center: options.center,
                zoom: options.zoom,
                options,
                sources: BTreeMap::new(),
                layers: Vec::new(),
                controls: Vec::new(),
                handlers: Vec::new(),
                next_handler: 0,
                loaded: false,
                live: Some(live.track()),
            })),
            render: Arc::new(render),
        };

        if container.render_mode() == RenderMode::Immediate {
            map.render_frame();
        }

        Ok(map)
    }

    /// Current center as `[lng, lat]`.
    pub fn get_center(&self) -> LngLat {
        LngLat::from_array(self.state.lock().center)
    }

    /// Sets the center from a `[lng, lat]` array.
    pub fn set_center(&self, center: [f64; 2]) -> Result<(), NativeMapError> {
        let mut state = self.live_state()?;
        state.center = center;
        Ok(())
    }

    pub fn get_zoom(&self) -> f64 {
        self.state.lock().zoom
    }

    pub fn set_zoom(&self, zoom: f64) -> Result<(), NativeMapError> {
        let mut state = self.live_state()?;
        state.zoom = zoom;
        Ok(())
    }

    pub fn get_style(&self) -> String {
        self.state.lock().options.style.clone()
    }

    pub fn access_token(&self) -> String {
        self.state.lock().options.access_token.clone()
    }

    /// Visible rectangle as `[[west, south], [east, north]]`.
    pub fn get_bounds(&self) -> [[f64; 2]; 2] {
        let state = self.state.lock();
        let view = ViewState::new(LatLng::new(state.center[1], state.center[0]), state.zoom);
        let bounds = geo::viewport_bounds(&view, state.width, state.height, MAPBOX_TILE_SIZE);
        [[bounds.west, bounds.south], [bounds.east, bounds.north]]
    }

    pub fn add_source(&self, id: &str, source: RasterSource) -> Result<(), NativeMapError> {
        let mut state = self.live_state()?;
        if state.sources.contains_key(id) {
            return Err(NativeMapError::DuplicateSource(id.to_string()));
        }
        state.sources.insert(id.to_string(), source);
        Ok(())
    }

    pub fn get_source(&self, id: &str) -> Option<RasterSource> {
        self.state.lock().sources.get(id).cloned()
    }

    /// Removes a source. Fails while a layer still references it.
    pub fn remove_source(&self, id: &str) -> Result<(), NativeMapError> {
        let mut state = self.live_state()?;
        if let Some(layer) = state.layers.iter().find(|l| l.source == id) {
            return Err(NativeMapError::SourceInUse {
                source_id: id.to_string(),
                layer_id: layer.id.clone(),
            });
        }
        state
            .sources
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| NativeMapError::MissingSource(id.to_string()))
    }

    pub fn add_layer(&self, layer: RasterLayer) -> Result<(), NativeMapError> {
        let mut state = self.live_state()?;
        if state.layers.iter().any(|l| l.id == layer.id) {
            return Err(NativeMapError::DuplicateLayer(layer.id));
        }
        if !state.sources.contains_key(&layer.source) {
            return Err(NativeMapError::MissingSource(layer.source));
        }
        state.layers.push(layer);
        Ok(())
    }

    pub fn get_layer(&self, id: &str) -> Option<RasterLayer> {
        self.state.lock().layers.iter().find(|l| l.id == id).cloned()
    }

    pub fn remove_layer(&self, id: &str) -> Result<(), NativeMapError> {
        let mut state = self.live_state()?;
        let before = state.layers.len();
        state.layers.retain(|l| l.id != id);
        if state.layers.len() == before {
            return Err(NativeMapError::MissingLayer(id.to_string()));
        }
        Ok(())
    }

    /// Layers in draw order.
    pub fn layers(&self) -> Vec<RasterLayer> {
        self.state.lock().layers.clone()
    }

    pub fn add_control(&self, control: &str) -> Result<(), NativeMapError> {
        let mut state = self.live_state()?;
        state.controls.push(control.to_string());
        Ok(())
    }

    pub fn controls(&self) -> Vec<String> {
        self.state.lock().controls.clone()
    }

    /// Registers a handler for a named event.
    pub fn on<F>(&self, event: &str, handler: F) -> Result<HandlerId, NativeMapError>
    where
        F: Fn(&MapboxEvent) + Send + Sync + 'static,
    {
        let mut state = self.live_state()?;
        let id = HandlerId(state.next_handler);
        state.next_handler += 1;
        state.handlers.push((id, event.to_string(), Arc::new(handler)));
        Ok(id)
    }

    /// Removes a handler. Returns false if it was not registered.
    pub fn off(&self, id: HandlerId) -> bool {
        let mut state = self.state.lock();
        let before = state.handlers.len();
        state.handlers.retain(|(hid, _, _)| *hid != id);
        state.handlers.len() != before
    }

    pub fn handler_count(&self, event: &str) -> usize {
        self.state
            .lock()
            .handlers
            .iter()
            .filter(|(_, name, _)| name == event)
            .count()
    }

    /// Dispatches an event to every matching handler.
    pub fn fire(&self, event: MapboxEvent) {
        let handlers: Vec<Handler> = {
            let state = self.state.lock();
            if state.live.is_none() {
                return;
            }
            state
                .handlers
                .iter()
                .filter(|(_, name, _)| name == event.name())
                .map(|(_, _, h)| Arc::clone(h))
                .collect()
        };
        for handler in handlers {
            handler(&event);
        }
    }

    /// Simulates a user click at a `[lng, lat]` position.
    pub fn click(&self, at: [f64; 2]) {
        let event = self.mouse_event(at);
        self.fire(MapboxEvent::Click(event));
    }

    /// Simulates pointer movement over a `[lng, lat]` position.
    pub fn mouse_move(&self, at: [f64; 2]) {
        let event = self.mouse_event(at);
        self.fire(MapboxEvent::MouseMove(event));
    }

    /// Completes a render pass. `load` fires on the first one only.
    pub fn render_frame(&self) {
        let first = {
            let mut state = self.state.lock();
            if state.live.is_none() {
                return;
            }
            let first = !state.loaded;
            state.loaded = true;
            first
        };

        let changed = self.render.send_if_modified(|state| {
            if *state == RenderState::Pending {
                *state = RenderState::Rendered;
                true
            } else {
                false
            }
        });

        if first && changed {
            self.fire(MapboxEvent::Load);
        }
    }

    /// Reports an SDK error (e.g. an unauthorized token).
    pub fn fail(&self, reason: &str) {
        if self.is_removed() {
            return;
        }
        self.render.send_if_modified(|state| {
            if *state == RenderState::Pending {
                *state = RenderState::Failed(reason.to_string());
                true
            } else {
                false
            }
        });
        self.fire(MapboxEvent::Error(reason.to_string()));
    }

    pub fn loaded(&self) -> bool {
        self.state.lock().loaded
    }

    pub fn render_state(&self) -> RenderState {
        self.render.borrow().clone()
    }

    pub fn subscribe_render(&self) -> watch::Receiver<RenderState> {
        self.render.subscribe()
    }

    /// Destroys the map and releases everything it holds.
    pub fn remove(&self) {
        let mut state = self.state.lock();
        state.handlers.clear();
        state.layers.clear();
        state.sources.clear();
        state.live.take();
    }

    pub fn is_removed(&self) -> bool {
        self.state.lock().live.is_none()
    }

    fn mouse_event(&self, at: [f64; 2]) -> MapMouseEvent {
        let state = self.state.lock();
        let center = LatLng::new(state.center[1], state.center[0]);
        let (cx, cy) = geo::project(center, state.zoom, MAPBOX_TILE_SIZE);
        let (px, py) = geo::project(LatLng::new(at[1], at[0]), state.zoom, MAPBOX_TILE_SIZE);
        MapMouseEvent {
            lng_lat: LngLat::from_array(at),
            point: (
                px - cx + state.width as f64 / 2.0,
                py - cy + state.height as f64 / 2.0,
            ),
        }
    }

    fn live_state(&self) -> Result<parking_lot::MutexGuard<'_, MapboxMapState>, NativeMapError> {
        let state = self.state.lock();
        if state.live.is_none() {
            return Err(NativeMapError::Removed);
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn map(mode: RenderMode) -> (MapboxMap, LiveMaps) {
        let live = LiveMaps::new();
        let container = MapContainer::new("map", 800, 600, mode);
        let map = MapboxMap::new(&container, MapboxMapOptions::default(), &live).unwrap();
        (map, live)
    }

    fn source() -> RasterSource {
        RasterSource {
            tiles: vec!["https://tiles/{z}/{x}/{y}".to_string()],
            tile_size: 256,
        }
    }

    fn layer(id: &str, source: &str) -> RasterLayer {
        RasterLayer {
            id: id.to_string(),
            source: source.to_string(),
            raster_opacity: 1.0,
            metadata: None,
        }
    }

    #[test]
    fn test_center_is_lng_lat_array() {
        let (map, _) = map(RenderMode::Immediate);
        map.set_center([10.0, 20.0]).unwrap();
        let center = map.get_center();
        assert_eq!(center.lng, 10.0);
        assert_eq!(center.lat, 20.0);
        assert_eq!(center.to_array(), [10.0, 20.0]);
    }

    #[test]
    fn test_duplicate_source_is_rejected() {
        let (map, _) = map(RenderMode::Immediate);
        map.add_source("ee", source()).unwrap();
        assert_eq!(
            map.add_source("ee", source()),
            Err(NativeMapError::DuplicateSource("ee".to_string()))
        );
    }

    #[test]
    fn test_layer_requires_source() {
        let (map, _) = map(RenderMode::Immediate);
        assert_eq!(
            map.add_layer(layer("ee", "missing")),
            Err(NativeMapError::MissingSource("missing".to_string()))
        );
    }

    #[test]
    fn test_source_in_use_cannot_be_removed() {
        let (map, _) = map(RenderMode::Immediate);
        map.add_source("ee", source()).unwrap();
        map.add_layer(layer("ee", "ee")).unwrap();

        assert!(matches!(
            map.remove_source("ee"),
            Err(NativeMapError::SourceInUse { .. })
        ));

        map.remove_layer("ee").unwrap();
        map.remove_source("ee").unwrap();
        assert!(map.get_source("ee").is_none());
        assert!(map.layers().is_empty());
    }

    #[test]
    fn test_load_fires_once() {
        let (map, _) = map(RenderMode::Deferred);
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        map.on("load", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        assert!(!map.loaded());
        map.render_frame();
        map.render_frame();

        assert!(map.loaded());
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(map.render_state(), RenderState::Rendered);
    }

    #[test]
    fn test_click_reports_lng_lat() {
        let (map, _) = map(RenderMode::Immediate);
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        map.on("click", move |event| {
            if let MapboxEvent::Click(e) = event {
                *sink.lock() = Some(e.lng_lat);
            }
        })
        .unwrap();

        map.click([36.8219, -1.2921]);

        let clicked = seen.lock().take().unwrap();
        assert_eq!(clicked.lng, 36.8219);
        assert_eq!(clicked.lat, -1.2921);
    }

    #[test]
    fn test_click_at_center_maps_to_container_middle() {
        let (map, _) = map(RenderMode::Immediate);
        let center = map.get_center().to_array();
        let event = map.mouse_event(center);
        assert!((event.point.0 - 400.0).abs() < 1e-6);
        assert!((event.point.1 - 300.0).abs() < 1e-6);
    }

    #[test]
    fn test_remove_releases_instance() {
        let (map, live) = map(RenderMode::Immediate);
        map.add_source("ee", source()).unwrap();
        map.remove();
        assert_eq!(live.count(), 0);
        assert!(map.get_source("ee").is_none());
        assert_eq!(map.add_control("nav"), Err(NativeMapError::Removed));
    }

    #[test]
    fn test_bounds_are_west_south_east_north() {
        let (map, _) = map(RenderMode::Immediate);
        let [[west, south], [east, north]] = map.get_bounds();
        let center = map.get_center();
        assert!(west < center.lng && center.lng < east);
        assert!(south < center.lat && center.lat < north);
    }
}
