//! In-process models of the two native map SDKs.
//!
//! The adapters in [`crate::provider`] are the only code that knows these
//! object models. They deliberately disagree the way the real SDKs do:
//!
//! | Concern        | [`GoogleMap`]                         | [`MapboxMap`]                          |
//! |----------------|----------------------------------------|-----------------------------------------|
//! | Center         | `GLatLng` object with `lat()`/`lng()` | `[lng, lat]` array                      |
//! | Ready signal   | `idle` after every render pass         | `load` once, after the first frame      |
//! | Overlays       | append-only `overlayMapTypes` list     | named sources + layers, ids are unique  |
//! | Listeners      | `addListener` → `ListenerId`           | `on` → `HandlerId`                      |
//!
//! Both maps are cheap, cloneable handles over shared state. A map counts as
//! live until [`GoogleMap::remove`] / [`MapboxMap::remove`] is called or its
//! last handle is dropped.

mod container;
mod google_map;
mod mapbox_map;

pub use container::{MapContainer, RenderMode};
pub use google_map::{
    GLatLng, GLatLngBounds, GoogleEvent, GoogleMap, GoogleMapOptions, ImageMapType, ListenerId,
    MapsMouseEvent,
};
pub use mapbox_map::{
    HandlerId, LngLat, MapMouseEvent, MapboxEvent, MapboxMap, MapboxMapOptions, RasterLayer,
    RasterSource,
};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use thiserror::Error;

use crate::provider::ProviderKind;

/// Errors raised by the native map models themselves.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NativeMapError {
    #[error("Map container '{0}' is not attached")]
    InvalidContainer(String),

    #[error("There is already a source with ID \"{0}\"")]
    DuplicateSource(String),

    #[error("Layer with id \"{0}\" already exists on this map")]
    DuplicateLayer(String),

    #[error("Source \"{0}\" does not exist")]
    MissingSource(String),

    #[error("Layer \"{0}\" does not exist")]
    MissingLayer(String),

    #[error("Source \"{source_id}\" cannot be removed while layer \"{layer_id}\" is using it")]
    SourceInUse { source_id: String, layer_id: String },

    #[error("Map has been removed")]
    Removed,
}

/// First-render progress of a native map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderState {
    Pending,
    Rendered,
    Failed(String),
}

/// Counts live native map instances created by one adapter.
#[derive(Debug, Clone, Default)]
pub struct LiveMaps {
    count: Arc<AtomicUsize>,
}

impl LiveMaps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of instances not yet removed or dropped.
    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }

    pub(crate) fn track(&self) -> LiveToken {
        self.count.fetch_add(1, Ordering::SeqCst);
        LiveToken {
            count: Arc::clone(&self.count),
        }
    }
}

/// Decrements its [`LiveMaps`] counter exactly once, on drop.
#[derive(Debug)]
pub(crate) struct LiveToken {
    count: Arc<AtomicUsize>,
}

impl Drop for LiveToken {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A native map from either SDK.
///
/// Adapters accept only their own variant.
#[derive(Debug, Clone)]
pub enum NativeMap {
    Google(GoogleMap),
    Mapbox(MapboxMap),
}

impl NativeMap {
    /// Provider role this native map belongs to.
    pub fn kind(&self) -> ProviderKind {
        match self {
            NativeMap::Google(_) => ProviderKind::Primary,
            NativeMap::Mapbox(_) => ProviderKind::Fallback,
        }
    }

    /// Drives one render pass, firing the SDK's ready event on the first.
    pub fn render_frame(&self) {
        match self {
            NativeMap::Google(map) => map.render_frame(),
            NativeMap::Mapbox(map) => map.render_frame(),
        }
    }

    /// Reports a fatal SDK error (bad key, style failure, ...).
    pub fn fail(&self, reason: &str) {
        match self {
            NativeMap::Google(map) => map.fail(reason),
            NativeMap::Mapbox(map) => map.fail(reason),
        }
    }

    pub fn render_state(&self) -> RenderState {
        match self {
            NativeMap::Google(map) => map.render_state(),
            NativeMap::Mapbox(map) => map.render_state(),
        }
    }

    pub fn subscribe_render(&self) -> tokio::sync::watch::Receiver<RenderState> {
        match self {
            NativeMap::Google(map) => map.subscribe_render(),
            NativeMap::Mapbox(map) => map.subscribe_render(),
        }
    }

    /// Tears the instance down. Idempotent.
    pub fn remove(&self) {
        match self {
            NativeMap::Google(map) => map.remove(),
            NativeMap::Mapbox(map) => map.remove(),
        }
    }

    pub fn is_removed(&self) -> bool {
        match self {
            NativeMap::Google(map) => map.is_removed(),
            NativeMap::Mapbox(map) => map.is_removed(),
        }
    }
}
