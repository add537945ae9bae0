//! Point lookups against Google's environmental APIs.
//!
//! Air quality and elevation are best-effort: a failed request is logged and
//! replaced with a neutral default so a dashboard can still render.
//! Country geocoding is not, since a caller navigating to a country needs to
//! know it was not found.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Credential;
use crate::geo::{Bounds, CoordError, LatLng};
use crate::http::{decode_json, HttpClient, HttpError};

const AIR_QUALITY_URL: &str = "https://airquality.googleapis.com/v1/currentConditions:lookup";
const ELEVATION_URL: &str = "https://maps.googleapis.com/maps/api/elevation/json";
const GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Errors from environmental lookups that are not degraded to defaults.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnvironmentError {
    #[error("Environmental data service not configured: {0}")]
    NotConfigured(String),

    #[error("Invalid location: {0}")]
    InvalidLocation(#[from] CoordError),

    #[error("Country not found: {0}")]
    CountryNotFound(String),

    #[error("Environmental data request failed: {0}")]
    Http(#[from] HttpError),
}

/// Current air quality at a point.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AirQuality {
    /// Index value, or `"N/A"` when unknown.
    pub aqi: String,
    pub category: String,
    pub dominant_pollutant: String,
}

impl Default for AirQuality {
    fn default() -> Self {
        Self {
            aqi: "N/A".to_string(),
            category: "Unknown".to_string(),
            dominant_pollutant: "N/A".to_string(),
        }
    }
}

/// Geocoded country.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryInfo {
    pub name: String,
    pub coordinates: LatLng,
    pub bounds: Option<Bounds>,
    pub formatted_address: String,
    pub place_id: String,
}

/// Everything known about one point.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentalReport {
    pub location: LatLng,
    pub air_quality: AirQuality,
    /// Meters above sea level; 0 when unknown.
    pub elevation: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AirQualityResponse {
    #[serde(default)]
    indexes: Vec<AirQualityIndex>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AirQualityIndex {
    aqi: Option<serde_json::Value>,
    category: Option<String>,
    dominant_pollutant: Option<String>,
}

#[derive(Deserialize)]
struct ElevationResponse {
    #[serde(default)]
    results: Vec<ElevationResult>,
}

#[derive(Deserialize)]
struct ElevationResult {
    elevation: f64,
}

#[derive(Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Deserialize)]
struct GeocodeResult {
    geometry: GeocodeGeometry,
    #[serde(default)]
    formatted_address: String,
    #[serde(default)]
    place_id: String,
}

#[derive(Deserialize)]
struct GeocodeGeometry {
    location: GeocodePoint,
    bounds: Option<GeocodeBounds>,
}

#[derive(Deserialize)]
struct GeocodePoint {
    lat: f64,
    lng: f64,
}

#[derive(Deserialize)]
struct GeocodeBounds {
    northeast: GeocodePoint,
    southwest: GeocodePoint,
}

/// Client for the air quality, elevation and geocoding APIs.
pub struct EnvironmentalDataClient {
    http: Arc<dyn HttpClient>,
    credential: Credential,
}

impl EnvironmentalDataClient {
    pub fn new(http: Arc<dyn HttpClient>, credential: Credential) -> Self {
        Self { http, credential }
    }

    fn key(&self) -> Result<&str, EnvironmentError> {
        self.credential
            .validate()
            .map_err(|e| EnvironmentError::NotConfigured(e.to_string()))
    }

    /// Air quality and elevation for a point.
    pub async fn report(&self, location: LatLng) -> Result<EnvironmentalReport, EnvironmentError> {
        location.validate()?;
        let (air_quality, elevation) =
            futures::join!(self.air_quality(location), self.elevation(location));
        Ok(EnvironmentalReport {
            location,
            air_quality,
            elevation,
        })
    }

    /// Current conditions; defaults on any failure.
    pub async fn air_quality(&self, location: LatLng) -> AirQuality {
        match self.fetch_air_quality(location).await {
            Ok(aq) => aq,
            Err(e) => {
                warn!(error = %e, lat = location.lat, lng = location.lng, "Air quality unavailable");
                AirQuality::default()
            }
        }
    }

    async fn fetch_air_quality(&self, location: LatLng) -> Result<AirQuality, EnvironmentError> {
        let url = format!("{}?key={}", AIR_QUALITY_URL, self.key()?);
        let body = serde_json::json!({
            "location": { "latitude": location.lat, "longitude": location.lng }
        });
        let bytes = self.http.post_json(&url, body).await.map_err(HttpError::redacted)?;
        let response: AirQualityResponse = decode_json(AIR_QUALITY_URL, &bytes)?;

        let mut result = AirQuality::default();
        if let Some(index) = response.indexes.into_iter().next() {
            if let Some(aqi) = index.aqi {
                result.aqi = match aqi {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
            }
            if let Some(category) = index.category {
                result.category = category;
            }
            if let Some(pollutant) = index.dominant_pollutant {
                result.dominant_pollutant = pollutant;
            }
        }
        debug!(aqi = %result.aqi, category = %result.category, "Air quality fetched");
        Ok(result)
    }

    /// Elevation in meters; 0 on any failure.
    pub async fn elevation(&self, location: LatLng) -> f64 {
        match self.fetch_elevation(location).await {
            Ok(meters) => meters,
            Err(e) => {
                warn!(error = %e, lat = location.lat, lng = location.lng, "Elevation unavailable");
                0.0
            }
        }
    }

    async fn fetch_elevation(&self, location: LatLng) -> Result<f64, EnvironmentError> {
        let url = format!(
            "{}?locations={},{}&key={}",
            ELEVATION_URL,
            location.lat,
            location.lng,
            self.key()?
        );
        let bytes = self.http.get(&url).await.map_err(HttpError::redacted)?;
        let response: ElevationResponse = decode_json(ELEVATION_URL, &bytes)?;
        Ok(response.results.first().map(|r| r.elevation).unwrap_or(0.0))
    }

    /// Geocodes a country by name.
    pub async fn country(&self, name: &str) -> Result<CountryInfo, EnvironmentError> {
        let query = name.trim();
        if query.is_empty() {
            return Err(EnvironmentError::CountryNotFound(name.to_string()));
        }

        let url = format!(
            "{}?address={}&key={}",
            GEOCODE_URL,
            encode_address(query),
            self.key()?
        );
        let bytes = self.http.get(&url).await.map_err(HttpError::redacted)?;
        let response: GeocodeResponse = decode_json(GEOCODE_URL, &bytes)?;

        let result = response
            .results
            .into_iter()
            .next()
            .ok_or_else(|| EnvironmentError::CountryNotFound(query.to_string()))?;

        let bounds = result.geometry.bounds.map(|b| {
            Bounds::new(b.northeast.lat, b.southwest.lat, b.northeast.lng, b.southwest.lng)
        });

        Ok(CountryInfo {
            name: query.to_string(),
            coordinates: LatLng::new(result.geometry.location.lat, result.geometry.location.lng),
            bounds,
            formatted_address: result.formatted_address,
            place_id: result.place_id,
        })
    }
}

fn encode_address(value: &str) -> String {
    value
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{:02X}", b),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::tests::MockHttpClient;

    const KEY: &str = "AIzaSyEnvironmentKey01";

    fn client(mock: Arc<MockHttpClient>) -> EnvironmentalDataClient {
        EnvironmentalDataClient::new(mock, Credential::new("environment_key", Some(KEY.to_string())))
    }

    #[tokio::test]
    async fn test_air_quality() {
        let mock = Arc::new(MockHttpClient::ok(
            r#"{"indexes":[{"code":"uaqi","aqi":72,"category":"Good air quality","dominantPollutant":"pm25"}]}"#,
        ));
        let aq = client(Arc::clone(&mock))
            .air_quality(LatLng::new(-1.2921, 36.8219))
            .await;
        assert_eq!(aq.aqi, "72");
        assert_eq!(aq.category, "Good air quality");
        assert_eq!(aq.dominant_pollutant, "pm25");

        let requests = mock.requests.lock();
        let (url, body) = &requests[0];
        assert!(url.starts_with(AIR_QUALITY_URL));
        assert_eq!(body.as_ref().unwrap()["location"]["latitude"], -1.2921);
    }

    #[tokio::test]
    async fn test_air_quality_degrades_on_failure() {
        let mock = Arc::new(MockHttpClient::err(HttpError::Status {
            url: AIR_QUALITY_URL.to_string(),
            status: 500,
        }));
        let aq = client(mock).air_quality(LatLng::new(0.0, 0.0)).await;
        assert_eq!(aq, AirQuality::default());
        assert_eq!(aq.aqi, "N/A");
        assert_eq!(aq.category, "Unknown");
    }

    #[tokio::test]
    async fn test_elevation() {
        let mock = Arc::new(MockHttpClient::ok(
            r#"{"results":[{"elevation":1661.4,"location":{"lat":-1.29,"lng":36.82}}],"status":"OK"}"#,
        ));
        let meters = client(Arc::clone(&mock))
            .elevation(LatLng::new(-1.29, 36.82))
            .await;
        assert_eq!(meters, 1661.4);
        assert!(mock.requested_urls()[0].contains("locations=-1.29,36.82"));
    }

    #[tokio::test]
    async fn test_elevation_degrades_without_key() {
        let mock = Arc::new(MockHttpClient::ok("{}"));
        let client = EnvironmentalDataClient::new(
            Arc::clone(&mock) as Arc<dyn HttpClient>,
            Credential::missing("environment_key"),
        );
        assert_eq!(client.elevation(LatLng::new(0.0, 0.0)).await, 0.0);
        assert!(mock.requested_urls().is_empty());
    }

    #[tokio::test]
    async fn test_country() {
        let mock = Arc::new(MockHttpClient::ok(
            r#"{"results":[{"formatted_address":"Kenya","place_id":"ChIJ","geometry":{
                "location":{"lat":-0.023559,"lng":37.906193},
                "bounds":{"northeast":{"lat":5.03,"lng":41.9},"southwest":{"lat":-4.72,"lng":33.9}}}}]}"#,
        ));
        let info = client(Arc::clone(&mock)).country("Kenya").await.unwrap();
        assert_eq!(info.coordinates, LatLng::new(-0.023559, 37.906193));
        assert_eq!(info.bounds, Some(Bounds::new(5.03, -4.72, 41.9, 33.9)));
        assert_eq!(info.place_id, "ChIJ");
    }

    #[tokio::test]
    async fn test_country_not_found() {
        let mock = Arc::new(MockHttpClient::ok(r#"{"results":[],"status":"ZERO_RESULTS"}"#));
        let err = client(mock).country("Atlantis").await.unwrap_err();
        assert_eq!(err, EnvironmentError::CountryNotFound("Atlantis".to_string()));
    }

    #[tokio::test]
    async fn test_country_encodes_name() {
        let mock = Arc::new(MockHttpClient::ok(r#"{"results":[]}"#));
        let _ = client(Arc::clone(&mock)).country("South Sudan").await;
        assert!(mock.requested_urls()[0].contains("address=South%20Sudan"));
    }

    #[tokio::test]
    async fn test_http_error_does_not_carry_key() {
        let mock = Arc::new(MockHttpClient::err(HttpError::Status {
            url: format!("{}?address=Kenya&key={}", GEOCODE_URL, KEY),
            status: 403,
        }));
        let err = client(mock).country("Kenya").await.unwrap_err();
        let shown = err.to_string();
        assert!(shown.contains("403"));
        assert!(!shown.contains(KEY), "{shown}");
    }

    #[tokio::test]
    async fn test_report_validates_location() {
        let mock = Arc::new(MockHttpClient::ok("{}"));
        let err = client(mock).report(LatLng::new(120.0, 0.0)).await.unwrap_err();
        assert!(matches!(err, EnvironmentError::InvalidLocation(_)));
    }
}
