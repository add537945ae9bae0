use std::sync::Arc;

use tracing::{error, info, warn};

use super::{MapError, MapHandle};
use crate::config::ConfigFile;
use crate::geo::ViewState;
use crate::loader::ScriptLoader;
use crate::provider::native::{MapContainer, NativeMap};
use crate::provider::{
    GoogleMapsProvider, MapProvider, MapboxProvider, ProviderError, ProviderKind, Readiness,
    StyleOptions,
};

/// Initial camera and styling for a new map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapOptions {
    pub view: ViewState,
    pub style: StyleOptions,
}

impl MapOptions {
    pub fn new(view: ViewState) -> Self {
        Self {
            view,
            style: StyleOptions::default(),
        }
    }

    pub fn with_style(mut self, style: StyleOptions) -> Self {
        self.style = style;
        self
    }
}

/// Produces a [`MapHandle`] from the best available provider.
///
/// With the primary provider preferred, the primary is tried first and the
/// fallback second. With the fallback preferred, only the fallback is tried.
/// The order is static.
pub struct MapInitializer {
    preferred: ProviderKind,
    primary: Arc<dyn MapProvider>,
    fallback: Arc<dyn MapProvider>,
}

impl MapInitializer {
    /// Creates an initializer preferring the primary provider.
    pub fn new(primary: Arc<dyn MapProvider>, fallback: Arc<dyn MapProvider>) -> Self {
        Self {
            preferred: ProviderKind::Primary,
            primary,
            fallback,
        }
    }

    /// Builds both adapters from configuration, sharing one loader.
    pub fn from_config(config: &ConfigFile, loader: ScriptLoader) -> Self {
        let ready_timeout = config.map.ready_timeout();
        let primary = GoogleMapsProvider::new(config.primary_credential(), loader.clone())
            .with_ready_timeout(ready_timeout);
        let fallback = MapboxProvider::new(config.fallback_credential(), loader)
            .with_ready_timeout(ready_timeout);

        Self::new(Arc::new(primary), Arc::new(fallback)).with_preferred(config.providers.preferred)
    }

    pub fn with_preferred(mut self, preferred: ProviderKind) -> Self {
        self.preferred = preferred;
        self
    }

    pub fn preferred(&self) -> ProviderKind {
        self.preferred
    }

    /// Providers in the order they will be attempted.
    pub fn attempt_order(&self) -> Vec<Arc<dyn MapProvider>> {
        match self.preferred {
            ProviderKind::Primary => vec![Arc::clone(&self.primary), Arc::clone(&self.fallback)],
            ProviderKind::Fallback => vec![Arc::clone(&self.fallback)],
        }
    }

    /// Creates a map in `container`.
    ///
    /// A provider failure of any kind is logged and the next provider is
    /// tried. Only when every attempt failed does this return
    /// [`MapError::InitFailed`], carrying each provider's error.
    pub async fn initialize(
        &self,
        container: &MapContainer,
        options: &MapOptions,
    ) -> Result<MapHandle, MapError> {
        let mut attempts = Vec::new();

        for adapter in self.attempt_order() {
            let result = Self::attempt(adapter.as_ref(), container, options).await;
            match result {
                Ok((native, readiness)) => {
                    info!(
                        provider = %adapter.kind(),
                        name = adapter.name(),
                        ?readiness,
                        "Map initialized"
                    );
                    return Ok(MapHandle::new(adapter, native, readiness));
                }
                Err(e) => {
                    warn!(provider = %adapter.kind(), error = %e, "Map provider unavailable");
                    attempts.push(e);
                }
            }
        }

        error!(attempts = attempts.len(), "No map provider available");
        Err(MapError::InitFailed { attempts })
    }

    async fn attempt(
        adapter: &dyn MapProvider,
        container: &MapContainer,
        options: &MapOptions,
    ) -> Result<(NativeMap, Readiness), ProviderError> {
        adapter.check_credentials()?;
        adapter.load_sdk().await?;

        let native = adapter.create(container, &options.view, &options.style)?;
        match adapter.on_ready(&native).await {
            Ok(readiness) => Ok((native, readiness)),
            Err(e) => {
                adapter.destroy(&native);
                Err(e)
            }
        }
    }
}
