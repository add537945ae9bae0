//! Configuration management CLI commands.
//!
//! Provides `config get`, `config set`, `config list`, and `config path` commands
//! for viewing and modifying configuration settings from the command line.
//! Secret values are masked on output.

use clap::Subcommand;
use envmap::config::{config_file_path, ConfigFile, ConfigKey, Credential};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Get a configuration value
    Get {
        /// Configuration key in format section.key (e.g., providers.preferred)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key in format section.key (e.g., providers.preferred)
        key: String,

        /// Value to set
        value: String,
    },

    /// List all configuration settings
    List,

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Get { key } => run_get(&key),
        ConfigCommands::Set { key, value } => run_set(&key, &value),
        ConfigCommands::List => run_list(),
        ConfigCommands::Path => run_path(),
    }
}

fn parse_key(key: &str) -> Result<ConfigKey, CliError> {
    key.parse().map_err(|_| {
        CliError::Config(format!(
            "Unknown configuration key '{}'. Use 'envmap config list' to see available keys.",
            key
        ))
    })
}

/// Value as shown to the user.
fn display_value(key: ConfigKey, value: String) -> String {
    if value.is_empty() {
        "(not set)".to_string()
    } else if key.is_secret() {
        Credential::new(key.key_name(), Some(value)).masked()
    } else {
        value
    }
}

/// Get a configuration value.
fn run_get(key: &str) -> Result<(), CliError> {
    let config_key = parse_key(key)?;
    let config = ConfigFile::load()?;
    println!("{}", display_value(config_key, config_key.get(&config)));
    Ok(())
}

/// Set a configuration value.
fn run_set(key: &str, value: &str) -> Result<(), CliError> {
    let config_key = parse_key(key)?;

    let mut config = ConfigFile::load()?;
    config_key.set(&mut config, value)?;
    config.save()?;

    println!(
        "Set {} = {}",
        config_key.name(),
        display_value(config_key, config_key.get(&config))
    );

    Ok(())
}

/// List all configuration settings.
fn run_list() -> Result<(), CliError> {
    let config = ConfigFile::load()?;

    println!("Configuration Settings");
    println!("======================");
    println!();

    let mut current_section = "";

    for &key in ConfigKey::all() {
        let section = key.section();

        if section != current_section {
            if !current_section.is_empty() {
                println!();
            }
            println!("[{}]", section);
            current_section = section;
        }

        println!(
            "  {} = {}",
            key.key_name(),
            display_value(key, key.get(&config))
        );
    }

    Ok(())
}

/// Show the configuration file path.
fn run_path() -> Result<(), CliError> {
    println!("{}", config_file_path().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secrets_are_masked() {
        let shown = display_value(
            ConfigKey::ProvidersPrimaryKey,
            "AIzaSyAbcdefghijklmnop".to_string(),
        );
        assert_ne!(shown, "AIzaSyAbcdefghijklmnop");
        assert!(!shown.contains("ghijklmnop"));
    }

    #[test]
    fn test_plain_values_are_shown() {
        assert_eq!(
            display_value(ConfigKey::ProvidersPreferred, "fallback".to_string()),
            "fallback"
        );
        assert_eq!(
            display_value(ConfigKey::ProvidersPreferred, String::new()),
            "(not set)"
        );
    }

    #[test]
    fn test_unknown_key() {
        assert!(matches!(parse_key("providers.nope"), Err(CliError::Config(_))));
    }
}
