//! EnvMap CLI - Command-line interface
//!
//! This binary probes map providers, mounts satellite analyses as overlays on
//! a headless map, and manages the `~/.envmap/config.ini` settings.

mod commands;
mod error;

use clap::{Parser, Subcommand};
use console::style;
use envmap::config::ConfigFile;
use envmap::logging::{init_logging, LoggingConfig};

use commands::config::ConfigCommands;
use commands::env::EnvArgs;
use commands::overlay::OverlayArgs;
use commands::probe::ProbeArgs;
use commands::tile_url::TileUrlArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "envmap")]
#[command(author, version, about = "Provider-agnostic environmental maps", long_about = None)]
struct Cli {
    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a headless map and report which provider was used
    Probe(ProbeArgs),

    /// Run a satellite analysis and mount it as an overlay
    Overlay(OverlayArgs),

    /// Print the tile URL for an analysis map id
    TileUrl(TileUrlArgs),

    /// Show air quality and elevation for a point
    Env(EnvArgs),

    /// View or modify configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{} {}", style("Error:").red().bold(), e);
        std::process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let command = match cli.command {
        Commands::Config { action } => return commands::config::run(action),
        command => command,
    };

    let config = ConfigFile::load_with_env()?;

    let mut logging = LoggingConfig::from(&config.logging);
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    let _guard = init_logging(&logging)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    match command {
        Commands::Probe(args) => runtime.block_on(commands::probe::run(args, &config)),
        Commands::Overlay(args) => runtime.block_on(commands::overlay::run(args, &config)),
        Commands::TileUrl(args) => commands::tile_url::run(args, &config),
        Commands::Env(args) => runtime.block_on(commands::env::run(args, &config)),
        Commands::Config { action } => commands::config::run(action),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_overlay_with_negative_bounds() {
        let cli = Cli::try_parse_from([
            "envmap",
            "overlay",
            "--analysis",
            "ndvi",
            "--bounds",
            "-1.0,-1.6,37.2,36.5",
            "--prefer",
            "fallback",
        ])
        .unwrap();
        let Commands::Overlay(args) = cli.command else {
            panic!("expected overlay command");
        };
        assert!(args.bounds.is_some());
        assert_eq!(
            args.map.prefer,
            Some(commands::common::ProviderChoice::Fallback)
        );
    }

    #[test]
    fn test_env_requires_point_or_country() {
        assert!(Cli::try_parse_from(["envmap", "env"]).is_err());
        assert!(Cli::try_parse_from(["envmap", "env", "--country", "Kenya"]).is_ok());
        assert!(Cli::try_parse_from(["envmap", "env", "--lat", "-1.29", "--lng", "36.8"]).is_ok());
    }
}
