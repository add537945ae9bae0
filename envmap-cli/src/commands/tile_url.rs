//! Tile URL command - expand an analysis map id into a tile URL.

use clap::Args;
use envmap::config::ConfigFile;
use envmap::{OverlayBridge, TileDescriptor};

use crate::error::CliError;

#[derive(Debug, Args)]
pub struct TileUrlArgs {
    /// Map id returned by the analysis service
    #[arg(long)]
    pub map_id: String,

    /// Tile access token returned with the map id
    #[arg(long)]
    pub token: String,

    /// Zoom level
    #[arg(long)]
    pub z: u8,

    /// Tile column
    #[arg(long)]
    pub x: u32,

    /// Tile row
    #[arg(long)]
    pub y: u32,

    /// Tile host (default from config)
    #[arg(long)]
    pub tile_host: Option<String>,
}

/// Run the tile-url command.
pub fn run(args: TileUrlArgs, config: &ConfigFile) -> Result<(), CliError> {
    println!("{}", tile_url(&args, config)?);
    Ok(())
}

fn tile_url(args: &TileUrlArgs, config: &ConfigFile) -> Result<String, CliError> {
    let host = args
        .tile_host
        .clone()
        .unwrap_or_else(|| config.map.tile_host.clone());
    let descriptor = TileDescriptor::map_id_token(args.map_id.clone(), args.token.clone(), "tile");
    let overlay = OverlayBridge::new(host).resolve(&descriptor)?;
    Ok(overlay.tile_url(args.z, args.x, args.y))
}
