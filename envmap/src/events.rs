//! Pointer event normalization.
//!
//! Each native SDK reports pointer positions in its own shape. The adapters
//! convert them here so callbacks always receive a [`LatLng`]. A
//! [`MapHandle`](crate::map::MapHandle) keeps at most one click and one move
//! callback; registering again replaces the previous one.

use std::fmt;
use std::sync::Arc;

use crate::geo::LatLng;
use crate::map::MapHandle;
use crate::provider::native::{MapMouseEvent, MapsMouseEvent};
use crate::provider::ProviderError;

/// Callback receiving normalized pointer coordinates.
pub type PointerCallback = Arc<dyn Fn(LatLng) + Send + Sync>;

/// Pointer event slots available on a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerEvent {
    Click,
    Move,
}

impl PointerEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            PointerEvent::Click => "click",
            PointerEvent::Move => "move",
        }
    }
}

impl fmt::Display for PointerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalizes a Google-style mouse event (`latLng.lat()`, `latLng.lng()`).
pub fn from_google_event(event: &MapsMouseEvent) -> LatLng {
    LatLng::new(event.lat_lng.lat(), event.lat_lng.lng())
}

/// Normalizes a Mapbox-style mouse event (`lngLat.lng`, `lngLat.lat`).
pub fn from_mapbox_event(event: &MapMouseEvent) -> LatLng {
    LatLng::new(event.lng_lat.lat, event.lng_lat.lng)
}

/// Wraps a closure as a [`PointerCallback`].
pub fn callback<F>(f: F) -> PointerCallback
where
    F: Fn(LatLng) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Registers normalized pointer callbacks on a [`MapHandle`].
///
/// One click and one move callback per handle; the latest registration
/// wins and the native listener it replaces is removed.
pub struct EventNormalizer;

impl EventNormalizer {
    pub fn on_click(handle: &mut MapHandle, callback: PointerCallback) -> Result<(), ProviderError> {
        handle.replace_listener(PointerEvent::Click, callback)
    }

    pub fn on_move(handle: &mut MapHandle, callback: PointerCallback) -> Result<(), ProviderError> {
        handle.replace_listener(PointerEvent::Move, callback)
    }

    /// Removes the callback in `event`'s slot. Returns false if none was set.
    pub fn clear(handle: &mut MapHandle, event: PointerEvent) -> Result<bool, ProviderError> {
        handle.remove_listener(event)
    }
}
