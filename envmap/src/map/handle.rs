use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::events::{PointerCallback, PointerEvent};
use crate::geo::{Bounds, LatLng, ViewState};
use crate::overlay::ResolvedOverlay;
use crate::provider::native::NativeMap;
use crate::provider::{ListenerToken, MapProvider, ProviderError, ProviderKind, Readiness};

/// A live map bound to the provider that created it.
///
/// The handle is owned by whoever called
/// [`MapInitializer::initialize`](super::MapInitializer::initialize). Its
/// provider never changes; switching providers means dropping the handle
/// and initializing again. Dropping the handle removes the native map.
pub struct MapHandle {
    adapter: Arc<dyn MapProvider>,
    native: NativeMap,
    readiness: Readiness,
    overlay: Option<ResolvedOverlay>,
    listeners: HashMap<PointerEvent, ListenerToken>,
}

impl fmt::Debug for MapHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapHandle")
            .field("provider", &self.adapter.kind())
            .field("readiness", &self.readiness)
            .field("overlay", &self.overlay.as_ref().map(|o| &o.name))
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl MapHandle {
    pub(crate) fn new(adapter: Arc<dyn MapProvider>, native: NativeMap, readiness: Readiness) -> Self {
        Self {
            adapter,
            native,
            readiness,
            overlay: None,
            listeners: HashMap::new(),
        }
    }

    /// Provider role, fixed for the handle's lifetime.
    pub fn provider_id(&self) -> ProviderKind {
        self.adapter.kind()
    }

    pub fn provider_name(&self) -> &str {
        self.adapter.name()
    }

    /// The underlying native map.
    pub fn native(&self) -> &NativeMap {
        &self.native
    }

    /// True once initialization has finished waiting for the first render.
    ///
    /// See [`readiness`](Self::readiness) for whether the wait timed out.
    pub fn is_ready(&self) -> bool {
        true
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness
    }

    pub fn set_center(&self, center: LatLng) -> Result<(), ProviderError> {
        self.adapter.set_center(&self.native, center)
    }

    pub fn set_zoom(&self, zoom: f64) -> Result<(), ProviderError> {
        self.adapter.set_zoom(&self.native, zoom)
    }

    /// Moves the camera. Last write wins; no history is kept.
    pub fn set_view(&self, view: &ViewState) -> Result<(), ProviderError> {
        view.validate()?;
        self.set_center(view.center)?;
        self.set_zoom(view.zoom)
    }

    pub fn view_state(&self) -> Result<ViewState, ProviderError> {
        self.adapter.view_state(&self.native)
    }

    pub fn bounds(&self) -> Result<Bounds, ProviderError> {
        self.adapter.get_bounds(&self.native)
    }

    /// The overlay mounted through the overlay bridge, if any.
    pub fn active_overlay(&self) -> Option<&ResolvedOverlay> {
        self.overlay.as_ref()
    }

    /// Overlay names currently mounted on the native map.
    pub fn mounted_overlays(&self) -> Result<Vec<String>, ProviderError> {
        self.adapter.overlay_names(&self.native)
    }

    /// Whether a callback is registered for `event`.
    pub fn has_listener(&self, event: PointerEvent) -> bool {
        self.listeners.contains_key(&event)
    }

    pub(crate) fn adapter(&self) -> &Arc<dyn MapProvider> {
        &self.adapter
    }

    pub(crate) fn set_active_overlay(&mut self, overlay: Option<ResolvedOverlay>) {
        self.overlay = overlay;
    }

    /// Installs `callback` in the `event` slot, replacing any previous one.
    ///
    /// The previous listener is removed first. On error the new callback is
    /// not installed; if the removal itself failed, the previous one stays.
    pub(crate) fn replace_listener(
        &mut self,
        event: PointerEvent,
        callback: PointerCallback,
    ) -> Result<(), ProviderError> {
        if let Some(previous) = self.listeners.remove(&event) {
            if let Err(e) = self.adapter.remove_listener(&self.native, previous) {
                self.listeners.insert(event, previous);
                return Err(e);
            }
        }
        let token = match event {
            PointerEvent::Click => self.adapter.on_click(&self.native, callback)?,
            PointerEvent::Move => self.adapter.on_move(&self.native, callback)?,
        };
        self.listeners.insert(event, token);
        debug!(provider = %self.provider_id(), %event, "Pointer callback registered");
        Ok(())
    }

    /// Empties the `event` slot. Returns false if it was already empty.
    pub(crate) fn remove_listener(&mut self, event: PointerEvent) -> Result<bool, ProviderError> {
        match self.listeners.remove(&event) {
            Some(token) => {
                self.adapter.remove_listener(&self.native, token)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Tears the map down now instead of at drop.
    pub fn dispose(self) {}
}

impl Drop for MapHandle {
    fn drop(&mut self) {
        debug!(provider = %self.adapter.kind(), "Disposing map");
        self.adapter.destroy(&self.native);
    }
}
