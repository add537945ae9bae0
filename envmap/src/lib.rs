//! EnvMap - provider-agnostic environmental maps
//!
//! This library creates a map on whichever provider is available (Google Maps
//! first, Mapbox as fallback), exposes one interface over both, and mounts
//! remote satellite-analysis tiles as overlays.
//!
//! # Overview
//!
//! ```text
//! ScriptLoader ──> MapProvider (Google | Mapbox) ──> MapInitializer ──> MapHandle
//!                                                                          │
//!                                        OverlayBridge, EventNormalizer ───┘
//! ```
//!
//! - [`loader`] fetches each SDK bundle at most once.
//! - [`provider`] adapts each SDK's object model to [`provider::MapProvider`].
//! - [`map`] picks a provider in a fixed order and hands back a [`map::MapHandle`].
//! - [`overlay`] turns analysis results into provider layers.
//! - [`events`] normalizes pointer events to [`geo::LatLng`].

pub mod analysis;
pub mod config;
pub mod environment;
pub mod events;
pub mod geo;
pub mod http;
pub mod loader;
pub mod logging;
pub mod map;
pub mod overlay;
pub mod provider;

pub use geo::{Bounds, LatLng, ViewState};
pub use map::{MapError, MapHandle, MapInitializer, MapOptions};
pub use overlay::{OverlayBridge, OverlayError, TileDescriptor};
pub use provider::{ProviderError, ProviderKind};
