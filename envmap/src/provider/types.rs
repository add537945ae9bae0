//! Core provider types and the [`MapProvider`] adapter trait.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use super::native::{HandlerId, ListenerId, MapContainer, NativeMap, NativeMapError};
use crate::events::PointerCallback;
use crate::geo::{Bounds, CoordError, LatLng, ViewState};
use crate::http::BoxFuture;
use crate::overlay::ResolvedOverlay;

/// Role of a provider in the fallback order.
///
/// The role is fixed when a map is created; a handle never switches
/// provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProviderKind {
    Primary,
    Fallback,
}

impl ProviderKind {
    /// Parse from a configuration string.
    pub fn from_config_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "primary" | "google" => Some(ProviderKind::Primary),
            "fallback" | "mapbox" => Some(ProviderKind::Fallback),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Primary => "primary",
            ProviderKind::Fallback => "fallback",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur in provider adapters.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// The provider cannot be used: bad credential, SDK not loaded, map
    /// construction failed, or the map reported an error before ready.
    #[error("{provider} provider unavailable: {reason}")]
    Unavailable {
        provider: ProviderKind,
        reason: String,
    },

    /// A native map from one provider was handed to the other adapter.
    #[error("{expected} adapter called with a {actual} map")]
    WrongProvider {
        expected: ProviderKind,
        actual: ProviderKind,
    },

    /// The native SDK rejected an operation.
    #[error("{provider} map operation failed: {source}")]
    Native {
        provider: ProviderKind,
        #[source]
        source: NativeMapError,
    },

    /// Coordinates or zoom were out of range.
    #[error("Invalid view: {0}")]
    InvalidView(#[from] CoordError),
}

impl ProviderError {
    pub fn unavailable(provider: ProviderKind, reason: impl Into<String>) -> Self {
        ProviderError::Unavailable {
            provider,
            reason: reason.into(),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, ProviderError::Unavailable { .. })
    }
}

/// Base map imagery requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapType {
    #[default]
    Satellite,
    Hybrid,
    Roadmap,
    Terrain,
}

impl MapType {
    pub fn from_config_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "satellite" => Some(MapType::Satellite),
            "hybrid" => Some(MapType::Hybrid),
            "roadmap" | "streets" => Some(MapType::Roadmap),
            "terrain" | "outdoors" => Some(MapType::Terrain),
            _ => None,
        }
    }
}

/// Styling requested at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StyleOptions {
    pub map_type: MapType,
    /// Explicit style URL for providers that use one; overrides `map_type`.
    pub style_url: Option<String>,
}

/// How the first render pass concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// The provider fired its ready event.
    Rendered,
    /// The bounded wait expired; the map is used anyway.
    TimedOut,
}

/// Native listener registration, used to replace or remove it later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerToken {
    Google(ListenerId),
    Mapbox(HandlerId),
}

/// Normalized operation set over one concrete map SDK.
///
/// Implementations are the only code that knows the SDK's coordinate order,
/// event payloads and overlay model. Every method taking a [`NativeMap`]
/// returns [`ProviderError::WrongProvider`] when given the other SDK's map.
pub trait MapProvider: Send + Sync {
    /// Role of this provider.
    fn kind(&self) -> ProviderKind;

    /// Human-readable name.
    fn name(&self) -> &str;

    /// SDK bundles that must be loaded before `create`.
    fn sdk_urls(&self) -> Vec<String>;

    /// Validates the provider credential without touching the network.
    fn check_credentials(&self) -> Result<(), ProviderError>;

    /// Loads the SDK bundles and verifies they are actually available.
    fn load_sdk(&self) -> BoxFuture<'_, Result<(), ProviderError>>;

    /// Bounded wait used by [`on_ready`](Self::on_ready).
    fn ready_timeout(&self) -> Duration;

    /// Creates a native map in `container`.
    fn create(
        &self,
        container: &MapContainer,
        view: &ViewState,
        style: &StyleOptions,
    ) -> Result<NativeMap, ProviderError>;

    /// Resolves after the first render pass, or after the bounded wait.
    fn on_ready<'a>(&'a self, map: &'a NativeMap) -> BoxFuture<'a, Result<Readiness, ProviderError>>;

    fn set_center(&self, map: &NativeMap, center: LatLng) -> Result<(), ProviderError>;

    fn set_zoom(&self, map: &NativeMap, zoom: f64) -> Result<(), ProviderError>;

    fn view_state(&self, map: &NativeMap) -> Result<ViewState, ProviderError>;

    fn get_bounds(&self, map: &NativeMap) -> Result<Bounds, ProviderError>;

    /// Registers a click listener that reports normalized coordinates.
    fn on_click(
        &self,
        map: &NativeMap,
        callback: PointerCallback,
    ) -> Result<ListenerToken, ProviderError>;

    /// Registers a pointer-move listener that reports normalized coordinates.
    fn on_move(
        &self,
        map: &NativeMap,
        callback: PointerCallback,
    ) -> Result<ListenerToken, ProviderError>;

    /// Removes a listener registered through this adapter.
    fn remove_listener(&self, map: &NativeMap, token: ListenerToken) -> Result<(), ProviderError>;

    /// Adds an overlay. Does not remove existing ones.
    fn add_overlay(&self, map: &NativeMap, overlay: &ResolvedOverlay) -> Result<(), ProviderError>;

    /// Removes every overlay this adapter manages.
    fn clear_overlay(&self, map: &NativeMap) -> Result<(), ProviderError>;

    /// Names of the overlays currently mounted, bottom first.
    fn overlay_names(&self, map: &NativeMap) -> Result<Vec<String>, ProviderError>;

    /// Tears the native map down.
    fn destroy(&self, map: &NativeMap);
}
