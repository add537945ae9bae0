//! Remote raster overlays.
//!
//! An analysis run yields a [`TileDescriptor`]; the [`OverlayBridge`] turns
//! it into a provider-specific layer on a [`MapHandle`]. A handle carries at
//! most one overlay: mounting a new one removes the old one first, and a
//! descriptor that fails validation leaves the map untouched.

mod descriptor;

pub use descriptor::{
    expand_tile_url, ResolvedOverlay, TileDescriptor, TileKind, ANALYSIS_OVERLAY_OPACITY,
    DEFAULT_OVERLAY_NAME, DEFAULT_TILE_HOST,
};

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::http::redact_url;
use crate::map::MapHandle;
use crate::provider::ProviderError;

/// Errors that can occur while mounting an overlay.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OverlayError {
    #[error("Invalid tile descriptor: {0}")]
    InvalidDescriptor(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl OverlayError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        OverlayError::InvalidDescriptor(reason.into())
    }
}

/// Mounts one remote raster overlay per map.
#[derive(Debug, Clone)]
pub struct OverlayBridge {
    tile_host: String,
}

impl Default for OverlayBridge {
    fn default() -> Self {
        Self::new(DEFAULT_TILE_HOST)
    }
}

impl OverlayBridge {
    /// Creates a bridge expanding map-id/token descriptors against `tile_host`.
    pub fn new(tile_host: impl Into<String>) -> Self {
        Self {
            tile_host: tile_host.into(),
        }
    }

    pub fn tile_host(&self) -> &str {
        &self.tile_host
    }

    /// Validates a descriptor without touching any map.
    pub fn resolve(&self, descriptor: &TileDescriptor) -> Result<ResolvedOverlay, OverlayError> {
        descriptor.resolve(&self.tile_host)
    }

    /// Replaces the handle's overlay with `descriptor`.
    ///
    /// The descriptor is validated before anything is removed. The existing
    /// overlay is then cleared and the new one added. If adding fails, the
    /// previous overlay is put back.
    pub fn set_overlay(
        &self,
        handle: &mut MapHandle,
        descriptor: &TileDescriptor,
    ) -> Result<(), OverlayError> {
        let resolved = self.resolve(descriptor).inspect_err(|e| {
            warn!(error = %e, "Rejected overlay descriptor, keeping current overlay");
        })?;

        let adapter = Arc::clone(handle.adapter());
        let native = handle.native().clone();

        if let Err(e) = adapter.clear_overlay(&native) {
            // A partial clear leaves nothing we can name as mounted.
            handle.set_active_overlay(None);
            return Err(e.into());
        }

        if let Err(e) = adapter.add_overlay(&native, &resolved) {
            if let Some(previous) = handle.active_overlay().cloned() {
                if let Err(restore) = adapter.add_overlay(&native, &previous) {
                    warn!(error = %restore, "Failed to restore previous overlay");
                    handle.set_active_overlay(None);
                }
            }
            return Err(e.into());
        }

        info!(
            provider = %handle.provider_id(),
            name = %resolved.name,
            tile_size = resolved.tile_size,
            opacity = resolved.opacity,
            "Overlay mounted"
        );
        debug!(template = %redact_url(&resolved.tile_url_template), "Overlay tile template");
        handle.set_active_overlay(Some(resolved));
        Ok(())
    }

    /// Removes the handle's overlay, if any.
    pub fn clear_overlay(&self, handle: &mut MapHandle) -> Result<(), OverlayError> {
        let adapter = Arc::clone(handle.adapter());
        if let Err(e) = adapter.clear_overlay(handle.native()) {
            handle.set_active_overlay(None);
            return Err(e.into());
        }
        if let Some(previous) = handle.active_overlay() {
            debug!(name = %previous.name, "Overlay cleared");
        }
        handle.set_active_overlay(None);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credential;
    use crate::loader::tests::test_loader;
    use crate::map::{MapInitializer, MapOptions};
    use crate::provider::native::MapContainer;
    use crate::provider::{GoogleMapsProvider, MapboxProvider, ProviderKind};

    async fn handle(kind: ProviderKind) -> MapHandle {
        let loader = test_loader();
        let init = MapInitializer::new(
            Arc::new(GoogleMapsProvider::new(
                Credential::new("primary_key", Some("AIzaSyTestKey0123456789".to_string())),
                loader.clone(),
            )),
            Arc::new(MapboxProvider::new(
                Credential::new("fallback_key", Some("pk.eyJ1IjoiZW52bWFwIn0.sig".to_string())),
                loader,
            )),
        )
        .with_preferred(kind);
        init.initialize(&MapContainer::headless("map", 640, 480), &MapOptions::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_set_overlay_replaces_on_both_providers() {
        let bridge = OverlayBridge::default();
        for kind in [ProviderKind::Primary, ProviderKind::Fallback] {
            let mut handle = handle(kind).await;
            assert_eq!(handle.provider_id(), kind);

            bridge
                .set_overlay(&mut handle, &TileDescriptor::map_id_token("abc", "xyz", "ndvi"))
                .unwrap();
            bridge
                .set_overlay(&mut handle, &TileDescriptor::map_id_token("def", "uvw", "rainfall"))
                .unwrap();

            assert_eq!(handle.mounted_overlays().unwrap(), vec!["rainfall"]);
            assert_eq!(handle.active_overlay().unwrap().name, "rainfall");
        }
    }

    #[tokio::test]
    async fn test_invalid_descriptor_keeps_previous_overlay() {
        let bridge = OverlayBridge::default();
        let mut handle = handle(ProviderKind::Primary).await;
        bridge
            .set_overlay(&mut handle, &TileDescriptor::map_id_token("abc", "xyz", "ndvi"))
            .unwrap();

        let err = bridge
            .set_overlay(&mut handle, &TileDescriptor::map_id_token("", "", "broken"))
            .unwrap_err();
        assert!(matches!(err, OverlayError::InvalidDescriptor(_)));
        assert_eq!(handle.mounted_overlays().unwrap(), vec!["ndvi"]);
        assert_eq!(handle.active_overlay().unwrap().name, "ndvi");
    }

    #[tokio::test]
    async fn test_clear_overlay() {
        let bridge = OverlayBridge::new("https://tiles.local");
        let mut handle = handle(ProviderKind::Fallback).await;
        bridge
            .set_overlay(&mut handle, &TileDescriptor::map_id_token("abc", "xyz", "ndvi"))
            .unwrap();
        assert!(handle
            .active_overlay()
            .unwrap()
            .tile_url_template
            .starts_with("https://tiles.local/abc/tiles/"));

        bridge.clear_overlay(&mut handle).unwrap();
        assert!(handle.mounted_overlays().unwrap().is_empty());
        assert!(handle.active_overlay().is_none());

        bridge.clear_overlay(&mut handle).unwrap();
    }
}
