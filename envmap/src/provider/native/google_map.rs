//! Google-style native map.
//!
//! Coordinates are `GLatLng` objects read through accessor methods, overlays
//! live in an append-only `overlayMapTypes` list, and `idle` fires after
//! every render pass.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

use super::{LiveMaps, LiveToken, MapContainer, NativeMapError, RenderMode, RenderState};
use crate::geo::{self, LatLng, ViewState, DEFAULT_TILE_SIZE};

/// A point with accessor methods, as the Google SDK exposes it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GLatLng {
    lat: f64,
    lng: f64,
}

impl GLatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }
}

/// Viewport rectangle described by its north-east and south-west corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GLatLngBounds {
    ne: GLatLng,
    sw: GLatLng,
}

impl GLatLngBounds {
    pub fn get_north_east(&self) -> GLatLng {
        self.ne
    }

    pub fn get_south_west(&self) -> GLatLng {
        self.sw
    }
}

/// Construction options.
#[derive(Debug, Clone, PartialEq)]
pub struct GoogleMapOptions {
    pub center: GLatLng,
    pub zoom: f64,
    pub map_type_id: String,
    pub gesture_handling: String,
    pub zoom_control: bool,
    pub street_view_control: bool,
    pub fullscreen_control: bool,
}

impl Default for GoogleMapOptions {
    fn default() -> Self {
        Self {
            center: GLatLng::new(-1.2921, 36.8219),
            zoom: 8.0,
            map_type_id: "satellite".to_string(),
            gesture_handling: "cooperative".to_string(),
            zoom_control: true,
            street_view_control: false,
            fullscreen_control: true,
        }
    }
}

/// A raster overlay entry in `overlayMapTypes`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageMapType {
    pub name: String,
    pub tile_size: u32,
    pub opacity: f32,
    pub tile_url_template: String,
}

impl ImageMapType {
    /// URL the SDK requests for one tile.
    pub fn get_tile_url(&self, x: u32, y: u32, z: u8) -> String {
        self.tile_url_template
            .replace("{z}", &z.to_string())
            .replace("{x}", &x.to_string())
            .replace("{y}", &y.to_string())
    }
}

/// Pointer event payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapsMouseEvent {
    pub lat_lng: GLatLng,
}

/// Events dispatched through `addListener`.
#[derive(Debug, Clone, PartialEq)]
pub enum GoogleEvent {
    Idle,
    Click(MapsMouseEvent),
    MouseMove(MapsMouseEvent),
    Error(String),
}

impl GoogleEvent {
    pub fn name(&self) -> &'static str {
        match self {
            GoogleEvent::Idle => "idle",
            GoogleEvent::Click(_) => "click",
            GoogleEvent::MouseMove(_) => "mousemove",
            GoogleEvent::Error(_) => "error",
        }
    }
}

/// Handle returned by `add_listener`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&GoogleEvent) + Send + Sync>;

struct GoogleMapState {
    container_id: String,
    width: u32,
    height: u32,
    center: GLatLng,
    zoom: f64,
    options: GoogleMapOptions,
    overlay_map_types: Vec<ImageMapType>,
    listeners: Vec<(ListenerId, String, Listener)>,
    next_listener: u64,
    live: Option<LiveToken>,
}

/// Google-style map instance.
#[derive(Clone)]
pub struct GoogleMap {
    state: Arc<Mutex<GoogleMapState>>,
    render: Arc<watch::Sender<RenderState>>,
}

impl fmt::Debug for GoogleMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("GoogleMap")
            .field("container", &state.container_id)
            .field("center", &state.center)
            .field("zoom", &state.zoom)
            .field("overlays", &state.overlay_map_types.len())
            .field("removed", &state.live.is_none())
            .finish()
    }
}

impl GoogleMap {
    /// Creates a map inside `container`.
    pub fn new(
        container: &MapContainer,
        options: GoogleMapOptions,
        live: &LiveMaps,
    ) -> Result<Self, NativeMapError> {
        if !container.is_attached() {
            return Err(NativeMapError::InvalidContainer(container.id().to_string()));
        }

        let (render, _) = watch::channel(RenderState::Pending);
        let map = Self {
            state: Arc::new(Mutex::new(GoogleMapState {
                container_id: container.id().to_string(),
                width: container.width(),
                height: container.height(),
                center: options.center,
                zoom: options.zoom,
                options,
                overlay_map_types: Vec::new(),
                listeners: Vec::new(),
                next_listener: 0,
                live: Some(live.track()),
            })),
            render: Arc::new(render),
        };

        if container.render_mode() == RenderMode::Immediate {
            map.render_frame();
        }

        Ok(map)
    }

    pub fn get_center(&self) -> GLatLng {
        self.state.lock().center
    }

    pub fn set_center(&self, center: GLatLng) -> Result<(), NativeMapError> {
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

    pub fn get_map_type_id(&self) -> String {
        self.state.lock().options.map_type_id.clone()
    }

    pub fn options(&self) -> GoogleMapOptions {
        self.state.lock().options.clone()
    }

    /// Visible rectangle for the current camera.
    pub fn get_bounds(&self) -> GLatLngBounds {
        let state = self.state.lock();
        let view = ViewState::new(
            LatLng::new(state.center.lat(), state.center.lng()),
            state.zoom,
        );
        let bounds = geo::viewport_bounds(&view, state.width, state.height, DEFAULT_TILE_SIZE);
        GLatLngBounds {
            ne: GLatLng::new(bounds.north, bounds.east),
            sw: GLatLng::new(bounds.south, bounds.west),
        }
    }

    /// Current contents of `overlayMapTypes`.
    pub fn overlay_map_types(&self) -> Vec<ImageMapType> {
        self.state.lock().overlay_map_types.clone()
    }

    /// Appends to `overlayMapTypes`. Existing entries are kept.
    pub fn push_overlay_map_type(&self, overlay: ImageMapType) -> Result<(), NativeMapError> {
        let mut state = self.live_state()?;
        state.overlay_map_types.push(overlay);
        Ok(())
    }

    /// Empties `overlayMapTypes`.
    pub fn clear_overlay_map_types(&self) {
        self.state.lock().overlay_map_types.clear();
    }

    /// Registers a listener for a named event.
    pub fn add_listener<F>(&self, event: &str, handler: F) -> Result<ListenerId, NativeMapError>
    where
        F: Fn(&GoogleEvent) + Send + Sync + 'static,
    {
        let mut state = self.live_state()?;
        let id = ListenerId(state.next_listener);
        state.next_listener += 1;
        state
            .listeners
            .push((id, event.to_string(), Arc::new(handler)));
        Ok(id)
    }

    /// Removes a listener. Returns false if it was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut state = self.state.lock();
        let before = state.listeners.len();
        state.listeners.retain(|(lid, _, _)| *lid != id);
        state.listeners.len() != before
    }

    /// Number of listeners registered for an event.
    pub fn listener_count(&self, event: &str) -> usize {
        self.state
            .lock()
            .listeners
            .iter()
            .filter(|(_, name, _)| name == event)
            .count()
    }

    /// Dispatches an event to every matching listener.
    pub fn trigger(&self, event: GoogleEvent) {
        let handlers: Vec<Listener> = {
            let state = self.state.lock();
            if state.live.is_none() {
                return;
            }
            state
                .listeners
                .iter()
                .filter(|(_, name, _)| name == event.name())
                .map(|(_, _, h)| Arc::clone(h))
                .collect()
        };
        for handler in handlers {
            handler(&event);
        }
    }

    /// Simulates a user click at a point.
    pub fn click(&self, at: GLatLng) {
        self.trigger(GoogleEvent::Click(MapsMouseEvent { lat_lng: at }));
    }

    /// Simulates pointer movement over a point.
    pub fn mouse_move(&self, at: GLatLng) {
        self.trigger(GoogleEvent::MouseMove(MapsMouseEvent { lat_lng: at }));
    }

    /// Completes a render pass; the map becomes idle.
    pub fn render_frame(&self) {
        if self.is_removed() {
            return;
        }
        self.render.send_if_modified(|state| {
            if *state == RenderState::Pending {
                *state = RenderState::Rendered;
                true
            } else {
                false
            }
        });
        self.trigger(GoogleEvent::Idle);
    }

    /// Reports an SDK error (e.g. an invalid key).
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
        self.trigger(GoogleEvent::Error(reason.to_string()));
    }

    pub fn render_state(&self) -> RenderState {
        self.render.borrow().clone()
    }

    pub fn subscribe_render(&self) -> watch::Receiver<RenderState> {
        self.render.subscribe()
    }

    /// Detaches the map from its container and drops all listeners and
    /// overlays.
    pub fn remove(&self) {
        let mut state = self.state.lock();
        state.listeners.clear();
        state.overlay_map_types.clear();
        state.live.take();
    }

    pub fn is_removed(&self) -> bool {
        self.state.lock().live.is_none()
    }

    fn live_state(&self) -> Result<parking_lot::MutexGuard<'_, GoogleMapState>, NativeMapError> {
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

    fn map(mode: RenderMode) -> (GoogleMap, LiveMaps) {
        let live = LiveMaps::new();
        let container = MapContainer::new("map", 800, 600, mode);
        let map = GoogleMap::new(&container, GoogleMapOptions::default(), &live).unwrap();
        (map, live)
    }

    #[test]
    fn test_detached_container_is_rejected() {
        let live = LiveMaps::new();
        let container = MapContainer::headless("", 800, 600);
        let result = GoogleMap::new(&container, GoogleMapOptions::default(), &live);
        assert!(matches!(result, Err(NativeMapError::InvalidContainer(_))));
        assert_eq!(live.count(), 0);
    }

    #[test]
    fn test_immediate_container_renders_on_construction() {
        let (map, _) = map(RenderMode::Immediate);
        assert_eq!(map.render_state(), RenderState::Rendered);
    }

    #[test]
    fn test_deferred_container_waits_for_frame() {
        let (map, _) = map(RenderMode::Deferred);
        assert_eq!(map.render_state(), RenderState::Pending);

        let idles = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&idles);
        map.add_listener("idle", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        map.render_frame();
        map.render_frame();
        assert_eq!(map.render_state(), RenderState::Rendered);
        assert_eq!(idles.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_overlay_map_types_are_append_only() {
        let (map, _) = map(RenderMode::Immediate);
        let overlay = ImageMapType {
            name: "ndvi".to_string(),
            tile_size: 256,
            opacity: 0.7,
            tile_url_template: "https://tiles/{z}/{x}/{y}".to_string(),
        };
        map.push_overlay_map_type(overlay.clone()).unwrap();
        map.push_overlay_map_type(overlay).unwrap();
        assert_eq!(map.overlay_map_types().len(), 2);

        map.clear_overlay_map_types();
        assert!(map.overlay_map_types().is_empty());
    }

    #[test]
    fn test_image_map_type_tile_url() {
        let overlay = ImageMapType {
            name: "ndvi".to_string(),
            tile_size: 256,
            opacity: 1.0,
            tile_url_template: "https://tiles/{z}/{x}/{y}?token=t".to_string(),
        };
        assert_eq!(overlay.get_tile_url(3, 5, 7), "https://tiles/7/3/5?token=t");
    }

    #[test]
    fn test_remove_listener() {
        let (map, _) = map(RenderMode::Immediate);
        let id = map.add_listener("click", |_| {}).unwrap();
        assert_eq!(map.listener_count("click"), 1);
        assert!(map.remove_listener(id));
        assert!(!map.remove_listener(id));
        assert_eq!(map.listener_count("click"), 0);
    }

    #[test]
    fn test_remove_detaches_and_releases_instance() {
        let (map, live) = map(RenderMode::Immediate);
        assert_eq!(live.count(), 1);

        map.remove();
        map.remove();

        assert!(map.is_removed());
        assert_eq!(live.count(), 0);
        assert_eq!(
            map.set_center(GLatLng::new(0.0, 0.0)),
            Err(NativeMapError::Removed)
        );
    }

    #[test]
    fn test_bounds_contain_center() {
        let (map, _) = map(RenderMode::Immediate);
        let bounds = map.get_bounds();
        let center = map.get_center();
        assert!(bounds.get_north_east().lat() > center.lat());
        assert!(bounds.get_south_west().lat() < center.lat());
        assert!(bounds.get_north_east().lng() > center.lng());
        assert!(bounds.get_south_west().lng() < center.lng());
    }

    #[test]
    fn test_fail_before_render() {
        let (map, _) = map(RenderMode::Deferred);
        map.fail("InvalidKeyMapError");
        assert_eq!(
            map.render_state(),
            RenderState::Failed("InvalidKeyMapError".to_string())
        );
        map.render_frame();
        assert_eq!(
            map.render_state(),
            RenderState::Failed("InvalidKeyMapError".to_string())
        );
    }
}
