//! Common types and utilities shared across CLI commands.

use std::sync::Arc;
use std::time::Duration;

use clap::{Args, ValueEnum};
use envmap::config::ConfigFile;
use envmap::geo::Bounds;
use envmap::http::{HttpClient, ReqwestClient};
use envmap::loader::{HttpScriptFetcher, ScriptLoader, ScriptRegistry};
use envmap::provider::native::MapContainer;
use envmap::provider::ProviderKind;
use envmap::{MapHandle, MapInitializer, MapOptions};
use indicatif::{ProgressBar, ProgressStyle};

use crate::error::CliError;

/// Map provider selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum ProviderChoice {
    /// Google Maps (requires GOOGLE_MAPS_API_KEY)
    Primary,
    /// Mapbox GL (requires MAPBOX_ACCESS_TOKEN)
    Fallback,
}

impl From<ProviderChoice> for ProviderKind {
    fn from(choice: ProviderChoice) -> Self {
        match choice {
            ProviderChoice::Primary => ProviderKind::Primary,
            ProviderChoice::Fallback => ProviderKind::Fallback,
        }
    }
}

/// Arguments describing the headless map to create.
#[derive(Debug, Clone, Args)]
pub struct MapArgs {
    /// Provider to try first (default from config)
    #[arg(long, value_enum)]
    pub prefer: Option<ProviderChoice>,

    /// Map container width in pixels
    #[arg(long, default_value_t = 1024)]
    pub width: u32,

    /// Map container height in pixels
    #[arg(long, default_value_t = 768)]
    pub height: u32,
}

pub fn http_client() -> Result<Arc<dyn HttpClient>, CliError> {
    Ok(Arc::new(ReqwestClient::new()?))
}

/// Loader fetching SDK bundles over HTTP with the configured wait and policy.
pub fn script_loader(config: &ConfigFile, http: Arc<dyn HttpClient>) -> ScriptLoader {
    ScriptLoader::new(ScriptRegistry::global(), Arc::new(HttpScriptFetcher::new(http)))
        .with_timeout(config.loader.timeout())
        .with_policy(config.loader.policy)
}

/// Creates a headless map on the best available provider.
pub async fn initialize_map(
    config: &ConfigFile,
    http: Arc<dyn HttpClient>,
    args: &MapArgs,
) -> Result<MapHandle, CliError> {
    let mut initializer = MapInitializer::from_config(config, script_loader(config, http));
    if let Some(prefer) = args.prefer {
        initializer = initializer.with_preferred(prefer.into());
    }

    let container = MapContainer::headless("envmap-cli", args.width, args.height);
    let options = MapOptions::new(config.map.initial_view());

    let pb = spinner("Loading map SDK...");
    let result = initializer.initialize(&container, &options).await;
    pb.finish_and_clear();

    Ok(result?)
}

/// Steady-ticking spinner shown while waiting on the network.
pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Parses `north,south,east,west`.
pub fn parse_bounds(s: &str) -> Result<Bounds, String> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid number in bounds: {}", e))?;

    let [north, south, east, west] = parts[..] else {
        return Err(format!(
            "expected 4 comma-separated values (north,south,east,west), got {}",
            parts.len()
        ));
    };

    let bounds = Bounds::new(north, south, east, west);
    bounds.validate().map_err(|e| e.to_string())?;
    Ok(bounds)
}
