//! Typed configuration keys in `section.key` form.

use std::path::PathBuf;
use std::str::FromStr;

use super::file::{validate_webhook_url, ConfigError, ConfigFile};
use crate::geo::{validate_zoom, LatLng};
use crate::loader::LoadPolicy;
use crate::provider::ProviderKind;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Every settable configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    ProvidersPreferred,
    ProvidersPrimaryKey,
    ProvidersFallbackKey,
    ServicesSatelliteKey,
    ServicesSatelliteEndpoint,
    ServicesGenerativeKey,
    ServicesVoiceKey,
    ServicesWebhookUrl,
    ServicesEnvironmentKey,
    LoaderTimeoutSecs,
    LoaderPolicy,
    MapCenterLat,
    MapCenterLng,
    MapZoom,
    MapReadyTimeoutSecs,
    MapTileHost,
    LoggingLevel,
    LoggingDirectory,
}

impl ConfigKey {
    /// All keys in file order.
    pub fn all() -> &'static [ConfigKey] {
        use ConfigKey::*;
        &[
            ProvidersPreferred,
            ProvidersPrimaryKey,
            ProvidersFallbackKey,
            ServicesSatelliteKey,
            ServicesSatelliteEndpoint,
            ServicesGenerativeKey,
            ServicesVoiceKey,
            ServicesWebhookUrl,
            ServicesEnvironmentKey,
            LoaderTimeoutSecs,
            LoaderPolicy,
            MapCenterLat,
            MapCenterLng,
            MapZoom,
            MapReadyTimeoutSecs,
            MapTileHost,
            LoggingLevel,
            LoggingDirectory,
        ]
    }

    /// Full `section.key` name.
    pub fn name(&self) -> String {
        format!("{}.{}", self.section(), self.key_name())
    }

    pub fn section(&self) -> &'static str {
        use ConfigKey::*;
        match self {
            ProvidersPreferred | ProvidersPrimaryKey | ProvidersFallbackKey => "providers",
            ServicesSatelliteKey
            | ServicesSatelliteEndpoint
            | ServicesGenerativeKey
            | ServicesVoiceKey
            | ServicesWebhookUrl
            | ServicesEnvironmentKey => "services",
            LoaderTimeoutSecs | LoaderPolicy => "loader",
            MapCenterLat | MapCenterLng | MapZoom | MapReadyTimeoutSecs | MapTileHost => "map",
            LoggingLevel | LoggingDirectory => "logging",
        }
    }

    pub fn key_name(&self) -> &'static str {
        use ConfigKey::*;
        match self {
            ProvidersPreferred => "preferred",
            ProvidersPrimaryKey => "primary_key",
            ProvidersFallbackKey => "fallback_key",
            ServicesSatelliteKey => "satellite_key",
            ServicesSatelliteEndpoint => "satellite_endpoint",
            ServicesGenerativeKey => "generative_key",
            ServicesVoiceKey => "voice_key",
            ServicesWebhookUrl => "webhook_url",
            ServicesEnvironmentKey => "environment_key",
            LoaderTimeoutSecs => "timeout_secs",
            LoaderPolicy => "policy",
            MapCenterLat => "center_lat",
            MapCenterLng => "center_lng",
            MapZoom => "zoom",
            MapReadyTimeoutSecs => "ready_timeout_secs",
            MapTileHost => "tile_host",
            LoggingLevel => "level",
            LoggingDirectory => "directory",
        }
    }

    /// Whether the value is a secret and should be masked when displayed.
    pub fn is_secret(&self) -> bool {
        use ConfigKey::*;
        matches!(
            self,
            ProvidersPrimaryKey
                | ProvidersFallbackKey
                | ServicesSatelliteKey
                | ServicesGenerativeKey
                | ServicesVoiceKey
                | ServicesEnvironmentKey
        )
    }

    /// Current value as a string; empty when unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        use ConfigKey::*;
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();
        match self {
            ProvidersPreferred => config.providers.preferred.to_string(),
            ProvidersPrimaryKey => opt(&config.providers.primary_key),
            ProvidersFallbackKey => opt(&config.providers.fallback_key),
            ServicesSatelliteKey => opt(&config.services.satellite_key),
            ServicesSatelliteEndpoint => config.services.satellite_endpoint.clone(),
            ServicesGenerativeKey => opt(&config.services.generative_key),
            ServicesVoiceKey => opt(&config.services.voice_key),
            ServicesWebhookUrl => opt(&config.services.webhook_url),
            ServicesEnvironmentKey => opt(&config.services.environment_key),
            LoaderTimeoutSecs => config.loader.timeout_secs.to_string(),
            LoaderPolicy => config.loader.policy.as_str().to_string(),
            MapCenterLat => config.map.center_lat.to_string(),
            MapCenterLng => config.map.center_lng.to_string(),
            MapZoom => config.map.zoom.to_string(),
            MapReadyTimeoutSecs => config.map.ready_timeout_secs.to_string(),
            MapTileHost => config.map.tile_host.clone(),
            LoggingLevel => config.logging.level.clone(),
            LoggingDirectory => config
                .logging
                .directory
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
        }
    }

    /// Validates and stores `value`. An empty value clears optional keys.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigError> {
        use ConfigKey::*;
        let name = self.name();
        let value = value.trim();
        let opt = || (!value.is_empty()).then(|| value.to_string());

        match self {
            ProvidersPreferred => {
                config.providers.preferred = ProviderKind::from_config_str(value)
                    .ok_or_else(|| ConfigError::invalid(&name, value, "expected primary or fallback"))?;
            }
            ProvidersPrimaryKey => config.providers.primary_key = opt(),
            ProvidersFallbackKey => config.providers.fallback_key = opt(),
            ServicesSatelliteKey => config.services.satellite_key = opt(),
            ServicesSatelliteEndpoint => {
                require_http(&name, value)?;
                config.services.satellite_endpoint = value.to_string();
            }
            ServicesGenerativeKey => config.services.generative_key = opt(),
            ServicesVoiceKey => config.services.voice_key = opt(),
            ServicesWebhookUrl => {
                if !value.is_empty() {
                    validate_webhook_url(value)?;
                }
                config.services.webhook_url = opt();
            }
            ServicesEnvironmentKey => config.services.environment_key = opt(),
            LoaderTimeoutSecs => config.loader.timeout_secs = parse_secs(&name, value)?,
            LoaderPolicy => {
                config.loader.policy = LoadPolicy::from_config_str(value).ok_or_else(|| {
                    ConfigError::invalid(&name, value, "expected fail_open or fail_closed")
                })?;
            }
            MapCenterLat => {
                let lat = parse_f64(&name, value)?;
                LatLng::new(lat, 0.0)
                    .validate()
                    .map_err(|e| ConfigError::invalid(&name, value, e.to_string()))?;
                config.map.center_lat = lat;
            }
            MapCenterLng => {
                let lng = parse_f64(&name, value)?;
                LatLng::new(0.0, lng)
                    .validate()
                    .map_err(|e| ConfigError::invalid(&name, value, e.to_string()))?;
                config.map.center_lng = lng;
            }
            MapZoom => {
                let zoom = parse_f64(&name, value)?;
                validate_zoom(zoom).map_err(|e| ConfigError::invalid(&name, value, e.to_string()))?;
                config.map.zoom = zoom;
            }
            MapReadyTimeoutSecs => config.map.ready_timeout_secs = parse_secs(&name, value)?,
            MapTileHost => {
                require_http(&name, value)?;
                config.map.tile_host = value.trim_end_matches('/').to_string();
            }
            LoggingLevel => {
                let level = value.to_lowercase();
                if !LOG_LEVELS.contains(&level.as_str()) {
                    return Err(ConfigError::invalid(
                        &name,
                        value,
                        "expected trace, debug, info, warn or error",
                    ));
                }
                config.logging.level = level;
            }
            LoggingDirectory => config.logging.directory = opt().map(PathBuf::from),
        }
        Ok(())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ConfigKey::all()
            .iter()
            .copied()
            .find(|key| key.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

fn parse_f64(name: &str, value: &str) -> Result<f64, ConfigError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ConfigError::invalid(name, value, "expected a number"))
}

fn parse_secs(name: &str, value: &str) -> Result<u64, ConfigError> {
    match value.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(ConfigError::invalid(
            name,
            value,
            "expected a positive number of seconds",
        )),
    }
}

fn require_http(name: &str, value: &str) -> Result<(), ConfigError> {
    if value.starts_with("https://") || value.starts_with("http://") {
        Ok(())
    } else {
        Err(ConfigError::invalid(name, value, "must be an http(s) URL"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_every_key_by_name() {
        for key in ConfigKey::all() {
            let parsed: ConfigKey = key.name().parse().unwrap();
            assert_eq!(parsed, *key);
        }
    }

    #[test]
    fn test_parse_unknown_key() {
        let err = "providers.bing_key".parse::<ConfigKey>().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey(_)));
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        let key: ConfigKey = "Map.Zoom".parse().unwrap();
        assert_eq!(key, ConfigKey::MapZoom);
    }

    #[test]
    fn test_set_and_get() {
        let mut config = ConfigFile::default();

        ConfigKey::ProvidersPreferred.set(&mut config, "fallback").unwrap();
        ConfigKey::LoaderPolicy.set(&mut config, "fail_closed").unwrap();
        ConfigKey::MapZoom.set(&mut config, "12").unwrap();
        ConfigKey::LoggingLevel.set(&mut config, "DEBUG").unwrap();

        assert_eq!(ConfigKey::ProvidersPreferred.get(&config), "fallback");
        assert_eq!(ConfigKey::LoaderPolicy.get(&config), "fail_closed");
        assert_eq!(ConfigKey::MapZoom.get(&config), "12");
        assert_eq!(ConfigKey::LoggingLevel.get(&config), "debug");
    }

    #[test]
    fn test_empty_value_clears_optional_key() {
        let mut config = ConfigFile::default();
        ConfigKey::ProvidersPrimaryKey
            .set(&mut config, "AIzaSyExample123456")
            .unwrap();
        assert!(config.providers.primary_key.is_some());

        ConfigKey::ProvidersPrimaryKey.set(&mut config, "  ").unwrap();
        assert_eq!(config.providers.primary_key, None);
        assert_eq!(ConfigKey::ProvidersPrimaryKey.get(&config), "");
    }

    #[test]
    fn test_set_rejects_invalid_values() {
        let mut config = ConfigFile::default();
        assert!(ConfigKey::MapCenterLat.set(&mut config, "95").is_err());
        assert!(ConfigKey::MapCenterLng.set(&mut config, "east").is_err());
        assert!(ConfigKey::MapZoom.set(&mut config, "30").is_err());
        assert!(ConfigKey::LoaderTimeoutSecs.set(&mut config, "0").is_err());
        assert!(ConfigKey::MapTileHost.set(&mut config, "tiles.local").is_err());
        assert!(ConfigKey::LoggingLevel.set(&mut config, "loud").is_err());
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_secret_keys() {
        assert!(ConfigKey::ProvidersPrimaryKey.is_secret());
        assert!(ConfigKey::ServicesVoiceKey.is_secret());
        assert!(!ConfigKey::ServicesWebhookUrl.is_secret());
        assert!(!ConfigKey::MapZoom.is_secret());
    }
}
