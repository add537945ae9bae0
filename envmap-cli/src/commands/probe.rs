//! Probe command - check which map provider can be initialized.

use clap::Args;
use console::{style, Term};
use envmap::config::ConfigFile;
use envmap::{MapError, ProviderError};

use super::common::{http_client, initialize_map, MapArgs};
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct ProbeArgs {
    #[command(flatten)]
    pub map: MapArgs,
}

/// Run the probe command.
pub async fn run(args: ProbeArgs, config: &ConfigFile) -> Result<(), CliError> {
    let handle = match initialize_map(config, http_client()?, &args.map).await {
        Ok(handle) => handle,
        Err(CliError::MapInit(MapError::InitFailed { attempts })) => {
            print_config_error(&attempts);
            return Err(MapError::InitFailed { attempts }.into());
        }
        Err(e) => return Err(e),
    };

    let view = handle.view_state()?;
    let bounds = handle.bounds()?;

    println!(
        "{} {} ({})",
        style("✓").green().bold(),
        style(handle.provider_name()).bold(),
        handle.provider_id()
    );
    println!("  Readiness: {:?}", handle.readiness());
    println!(
        "  Center:    {:.4}, {:.4} @ zoom {}",
        view.center.lat, view.center.lng, view.zoom
    );
    println!(
        "  Bounds:    N {:.4}  S {:.4}  E {:.4}  W {:.4}",
        bounds.north, bounds.south, bounds.east, bounds.west
    );

    handle.dispose();
    Ok(())
}

/// Prints the panel shown when no provider could be initialized.
fn print_config_error(attempts: &[ProviderError]) {
    let term = Term::stderr();
    let _ = term.write_line(&format!(
        "{}",
        style("Map configuration error").red().bold()
    ));
    let _ = term.write_line("");
    if attempts.is_empty() {
        let _ = term.write_line("  No map providers configured.");
    }
    for attempt in attempts {
        let _ = term.write_line(&format!("  {} {}", style("✗").red(), attempt));
    }
    let _ = term.write_line("");
    let _ = term.write_line(&format!(
        "  Set {} or {}, or run {}.",
        style("GOOGLE_MAPS_API_KEY").cyan(),
        style("MAPBOX_ACCESS_TOKEN").cyan(),
        style("envmap config set providers.primary_key <key>").cyan()
    ));
}
