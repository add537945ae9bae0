//! Env command - environmental data for a point or a country.

use clap::Args;
use console::style;
use envmap::config::ConfigFile;
use envmap::environment::EnvironmentalDataClient;
use envmap::LatLng;

use super::common::{http_client, spinner};
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct EnvArgs {
    /// Latitude in degrees
    #[arg(long, allow_hyphen_values = true, required_unless_present = "country")]
    pub lat: Option<f64>,

    /// Longitude in degrees
    #[arg(long, allow_hyphen_values = true, required_unless_present = "country")]
    pub lng: Option<f64>,

    /// Geocode a country instead of looking up a point
    #[arg(long, conflicts_with_all = ["lat", "lng"])]
    pub country: Option<String>,
}

/// Run the env command.
pub async fn run(args: EnvArgs, config: &ConfigFile) -> Result<(), CliError> {
    let client = EnvironmentalDataClient::new(http_client()?, config.environment_credential());

    if let Some(name) = args.country {
        let pb = spinner(&format!("Looking up {}...", name));
        let result = client.country(&name).await;
        pb.finish_and_clear();
        let country = result?;

        println!("{}", style(&country.formatted_address).bold());
        println!(
            "  Coordinates: {:.4}, {:.4}",
            country.coordinates.lat, country.coordinates.lng
        );
        if let Some(b) = country.bounds {
            println!(
                "  Bounds:      N {:.4}  S {:.4}  E {:.4}  W {:.4}",
                b.north, b.south, b.east, b.west
            );
        }
        println!("  Place id:    {}", country.place_id);
        return Ok(());
    }

    let (Some(lat), Some(lng)) = (args.lat, args.lng) else {
        return Err(CliError::Config(
            "Both --lat and --lng are required".to_string(),
        ));
    };

    let pb = spinner("Fetching environmental data...");
    let result = client.report(LatLng::new(lat, lng)).await;
    pb.finish_and_clear();
    let report = result?;

    println!(
        "{}",
        style(format!("{:.4}, {:.4}", report.location.lat, report.location.lng)).bold()
    );
    println!(
        "  Air quality: {} ({}), dominant pollutant {}",
        report.air_quality.aqi, report.air_quality.category, report.air_quality.dominant_pollutant
    );
    println!("  Elevation:   {:.0} m", report.elevation);
    Ok(())
}
