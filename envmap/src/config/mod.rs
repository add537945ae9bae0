//! Configuration: credentials, the INI file and environment overrides.
//!
//! Settings live in `~/.envmap/config.ini`. Environment variables take
//! precedence over the file for the credential-like keys listed in
//! [`ENV_OVERRIDES`].

mod credential;
mod file;
mod keys;

pub use credential::{mask_secret, Credential, CredentialError, MIN_CREDENTIAL_LEN};
pub use file::{
    validate_webhook_url, ConfigError, ConfigFile, LoaderSettings, LoggingSettings, MapSettings,
    ProvidersSettings, ServicesSettings, DEFAULT_READY_TIMEOUT_SECS, DEFAULT_SATELLITE_ENDPOINT,
};
pub use keys::ConfigKey;

use std::path::PathBuf;

/// Environment variables and the keys they override.
pub const ENV_OVERRIDES: [(&str, ConfigKey); 6] = [
    ("GOOGLE_MAPS_API_KEY", ConfigKey::ProvidersPrimaryKey),
    ("MAPBOX_ACCESS_TOKEN", ConfigKey::ProvidersFallbackKey),
    ("EARTH_ENGINE_TOKEN", ConfigKey::ServicesSatelliteKey),
    ("GEMINI_API_KEY", ConfigKey::ServicesGenerativeKey),
    ("VAPI_API_KEY", ConfigKey::ServicesVoiceKey),
    ("AUTOMATION_WEBHOOK_URL", ConfigKey::ServicesWebhookUrl),
];

/// `~/.envmap`, or `./.envmap` when no home directory is known.
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".envmap")
}

pub fn config_file_path() -> PathBuf {
    config_dir().join("config.ini")
}
