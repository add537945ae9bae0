//! Overlay command - run an analysis and mount it on a headless map.

use clap::Args;
use console::style;
use envmap::analysis::{AnalysisKind, EarthEngineClient, SatelliteAnalysis};
use envmap::config::ConfigFile;
use envmap::geo::{to_tile_coords, Bounds};
use envmap::{OverlayBridge, TileDescriptor};

use super::common::{http_client, initialize_map, parse_bounds, spinner, MapArgs};
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct OverlayArgs {
    /// Analysis to run (e.g. ndvi, deforestation, water_quality)
    #[arg(long)]
    pub analysis: AnalysisKind,

    /// Region as north,south,east,west (default: the visible map)
    #[arg(long, value_parser = parse_bounds, allow_hyphen_values = true)]
    pub bounds: Option<Bounds>,

    #[command(flatten)]
    pub map: MapArgs,
}

/// Run the overlay command.
pub async fn run(args: OverlayArgs, config: &ConfigFile) -> Result<(), CliError> {
    let http = http_client()?;
    let mut handle = initialize_map(config, http.clone(), &args.map).await?;

    let region = match args.bounds {
        Some(bounds) => bounds,
        None => handle.bounds()?,
    };

    let client = EarthEngineClient::new(
        http,
        config.services.satellite_endpoint.clone(),
        config.satellite_credential(),
    );

    let pb = spinner(&format!("Running {} analysis...", args.analysis));
    let result = client.compute_map(region, args.analysis).await;
    pb.finish_and_clear();
    let map_token = result?;

    let bridge = OverlayBridge::new(config.map.tile_host.clone());
    bridge.set_overlay(
        &mut handle,
        &TileDescriptor::from_analysis(&map_token, args.analysis),
    )?;

    let view = handle.view_state()?;
    let tile = to_tile_coords(view.center.lat, view.center.lng, view.zoom.round() as u8)?;

    if let Some(overlay) = handle.active_overlay() {
        println!(
            "{} {} on {}",
            style("✓").green().bold(),
            style(&overlay.name).bold(),
            handle.provider_name()
        );
        println!("  Description: {}", args.analysis.description());
        println!("  Opacity:     {}", overlay.opacity);
        println!("  Template:    {}", overlay.tile_url_template);
        println!(
            "  Center tile: {}",
            overlay.tile_url(tile.zoom, tile.col, tile.row)
        );
    }

    handle.dispose();
    Ok(())
}
