//! INI-backed configuration file.
//!
//! ```ini
//! [providers]
//! preferred = primary
//! primary_key = AIza...
//! fallback_key = pk.eyJ...
//!
//! [services]
//! satellite_key =
//! satellite_endpoint = https://earthengine.googleapis.com/v1/projects/earthengine-legacy/maps
//! generative_key =
//! voice_key =
//! webhook_url =
//! environment_key =
//!
//! [loader]
//! timeout_secs = 15
//! policy = fail_open
//!
//! [map]
//! center_lat = -1.2921
//! center_lng = 36.8219
//! zoom = 8
//! ready_timeout_secs = 8
//! tile_host = https://earthengine.googleapis.com/v1alpha/projects/earthengine-legacy/maps
//!
//! [logging]
//! level = info
//! directory =
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;
use tracing::{debug, warn};

use super::credential::{Credential, CredentialError};
use super::{config_file_path, ENV_OVERRIDES};
use crate::geo::{LatLng, ViewState};
use crate::loader::{LoadPolicy, DEFAULT_LOAD_TIMEOUT, MAX_LOAD_TIMEOUT, MIN_LOAD_TIMEOUT};
use crate::overlay::DEFAULT_TILE_HOST;
use crate::provider::ProviderKind;

/// Default analysis endpoint.
pub const DEFAULT_SATELLITE_ENDPOINT: &str =
    "https://earthengine.googleapis.com/v1/projects/earthengine-legacy/maps";

/// Default bounded wait for a map's first render.
pub const DEFAULT_READY_TIMEOUT_SECS: u64 = 8;

/// Errors that can occur while reading or writing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid value for {key}: '{value}' ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, value: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// `[providers]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct ProvidersSettings {
    pub preferred: ProviderKind,
    pub primary_key: Option<String>,
    pub fallback_key: Option<String>,
}

impl Default for ProvidersSettings {
    fn default() -> Self {
        Self {
            preferred: ProviderKind::Primary,
            primary_key: None,
            fallback_key: None,
        }
    }
}

/// `[services]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct ServicesSettings {
    pub satellite_key: Option<String>,
    pub satellite_endpoint: String,
    pub generative_key: Option<String>,
    pub voice_key: Option<String>,
    pub webhook_url: Option<String>,
    pub environment_key: Option<String>,
}

impl Default for ServicesSettings {
    fn default() -> Self {
        Self {
            satellite_key: None,
            satellite_endpoint: DEFAULT_SATELLITE_ENDPOINT.to_string(),
            generative_key: None,
            voice_key: None,
            webhook_url: None,
            environment_key: None,
        }
    }
}

/// `[loader]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderSettings {
    pub timeout_secs: u64,
    pub policy: LoadPolicy,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_LOAD_TIMEOUT.as_secs(),
            policy: LoadPolicy::default(),
        }
    }
}

impl LoaderSettings {
    /// Script-load timeout, clamped to the supported window.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs).clamp(MIN_LOAD_TIMEOUT, MAX_LOAD_TIMEOUT)
    }
}

/// `[map]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct MapSettings {
    pub center_lat: f64,
    pub center_lng: f64,
    pub zoom: f64,
    pub ready_timeout_secs: u64,
    pub tile_host: String,
}

impl Default for MapSettings {
    fn default() -> Self {
        let view = ViewState::default();
        Self {
            center_lat: view.center.lat,
            center_lng: view.center.lng,
            zoom: view.zoom,
            ready_timeout_secs: DEFAULT_READY_TIMEOUT_SECS,
            tile_host: DEFAULT_TILE_HOST.to_string(),
        }
    }
}

impl MapSettings {
    pub fn initial_view(&self) -> ViewState {
        ViewState::new(LatLng::new(self.center_lat, self.center_lng), self.zoom)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub level: String,
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

/// Complete configuration file contents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub providers: ProvidersSettings,
    pub services: ServicesSettings,
    pub loader: LoaderSettings,
    pub map: MapSettings,
    pub logging: LoggingSettings,
}

impl ConfigFile {
    /// Loads `~/.envmap/config.ini`, or defaults if it does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Loads from an explicit path, or defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Self::from_ini(&ini)
    }

    /// Loads the file, then applies process environment overrides.
    ///
    /// Credentials that are set but fail validation are logged as warnings;
    /// the components that need them report unavailable later.
    pub fn load_with_env() -> Result<Self, ConfigError> {
        let mut config = Self::load()?;
        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        for e in config.invalid_credentials() {
            warn!(error = %e, "Configured credential will be rejected");
        }
        Ok(config)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for (section, props) in ini.iter() {
            let Some(section) = section else {
                continue;
            };
            for (key, value) in props.iter() {
                let name = format!("{}.{}", section, key);
                match name.parse::<super::ConfigKey>() {
                    Ok(config_key) => config_key.set(&mut config, value)?,
                    Err(_) => debug!(key = %name, "Ignoring unknown config key"),
                }
            }
        }

        Ok(config)
    }

    /// Writes to `~/.envmap/config.ini`, creating the directory.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&config_file_path())
    }

    /// Writes to an explicit path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }

        let mut ini = Ini::new();
        for key in super::ConfigKey::all() {
            let value = key.get(self);
            if !value.is_empty() {
                ini.with_section(Some(key.section()))
                    .set(key.key_name(), value);
            }
        }

        ini.write_to_file(path).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Overrides settings from environment variables.
    ///
    /// `lookup` is usually `std::env::var(..).ok()`; tests pass a map.
    /// Empty values are ignored.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        for (var, key) in ENV_OVERRIDES {
            if let Some(value) = lookup(var).filter(|v| !v.trim().is_empty()) {
                debug!(var, key = key.name(), "Applying environment override");
                key.set(self, &value)?;
            }
        }
        Ok(())
    }

    /// Primary map provider credential.
    pub fn primary_credential(&self) -> Credential {
        Credential::new("primary_key", self.providers.primary_key.clone())
    }

    /// Fallback map provider credential.
    pub fn fallback_credential(&self) -> Credential {
        Credential::new("fallback_key", self.providers.fallback_key.clone())
    }

    pub fn satellite_credential(&self) -> Credential {
        Credential::new("satellite_key", self.services.satellite_key.clone())
    }

    pub fn generative_credential(&self) -> Credential {
        Credential::new("generative_key", self.services.generative_key.clone())
    }

    pub fn voice_credential(&self) -> Credential {
        Credential::new("voice_key", self.services.voice_key.clone())
    }

    pub fn environment_credential(&self) -> Credential {
        Credential::new("environment_key", self.services.environment_key.clone())
    }

    /// Every credential the configuration carries.
    pub fn credentials(&self) -> [Credential; 6] {
        [
            self.primary_credential(),
            self.fallback_credential(),
            self.satellite_credential(),
            self.generative_credential(),
            self.voice_credential(),
            self.environment_credential(),
        ]
    }

    /// Validation failures of credentials that are set. Unset ones are
    /// optional and not reported.
    pub fn invalid_credentials(&self) -> Vec<CredentialError> {
        self.credentials()
            .iter()
            .filter_map(|c| c.validate().err())
            .filter(|e| !matches!(e, CredentialError::Missing { .. }))
            .collect()
    }
}

/// Checks that a webhook URL uses http or https and has a host.
pub fn validate_webhook_url(value: &str) -> Result<(), ConfigError> {
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"))
        .ok_or_else(|| ConfigError::invalid("services.webhook_url", value, "must be http(s)"))?;

    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() {
        return Err(ConfigError::invalid(
            "services.webhook_url",
            value,
            "missing host",
        ));
    }
    Ok(())
}
