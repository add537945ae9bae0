//! Satellite analysis requests.
//!
//! The analysis service computes an image for a region and returns a
//! `{mapId, token}` pair that addresses its tiles. This crate only builds
//! the request and consumes that pair; see
//! [`TileDescriptor::from_analysis`](crate::overlay::TileDescriptor::from_analysis).

mod catalog;

pub use catalog::{
    AnalysisCategory, AnalysisKind, AnalysisSpec, DateWindow, Reducer, Visualization,
};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Credential;
use crate::geo::{Bounds, CoordError};
use crate::http::{decode_json, BoxFuture, HttpClient, HttpError};

/// Errors that can occur while requesting an analysis.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("Unknown analysis type: {0}")]
    UnknownKind(String),

    #[error("Invalid analysis region: {0}")]
    InvalidBounds(#[from] CoordError),

    #[error("Analysis service not authenticated: {0}")]
    Unauthenticated(String),

    #[error("Analysis request failed: {0}")]
    Http(#[from] HttpError),

    #[error("Analysis service returned an unusable result: {0}")]
    InvalidResponse(String),
}

/// Tile addressing returned by the analysis service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapToken {
    #[serde(alias = "mapid")]
    pub map_id: String,
    pub token: String,
}

/// A remote service that computes analysis imagery for a region.
pub trait SatelliteAnalysis: Send + Sync {
    fn compute_map(
        &self,
        bounds: Bounds,
        kind: AnalysisKind,
    ) -> BoxFuture<'_, Result<MapToken, AnalysisError>>;
}

/// Earth Engine map-id client.
///
/// Posts the analysis request as JSON to the configured endpoint and reads
/// back `{mapId, token}`.
pub struct EarthEngineClient {
    http: Arc<dyn HttpClient>,
    endpoint: String,
    credential: Credential,
}

impl EarthEngineClient {
    pub fn new(http: Arc<dyn HttpClient>, endpoint: impl Into<String>, credential: Credential) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
            credential,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Request body for one analysis.
    pub fn request_body(bounds: &Bounds, kind: AnalysisKind) -> serde_json::Value {
        json!({
            "analysis": kind.id(),
            "region": {
                "west": bounds.west,
                "south": bounds.south,
                "east": bounds.east,
                "north": bounds.north,
            },
            "spec": kind.spec(),
        })
    }

    fn request_url(&self, token: &str) -> String {
        format!(
            "{}?access_token={}",
            self.endpoint.trim_end_matches('/'),
            token
        )
    }
}

impl SatelliteAnalysis for EarthEngineClient {
    fn compute_map(
        &self,
        bounds: Bounds,
        kind: AnalysisKind,
    ) -> BoxFuture<'_, Result<MapToken, AnalysisError>> {
        Box::pin(async move {
            bounds.validate()?;
            let token = self
                .credential
                .validate()
                .map_err(|e| AnalysisError::Unauthenticated(e.to_string()))?;

            debug!(
                analysis = kind.id(),
                endpoint = %self.endpoint,
                token = %self.credential.masked(),
                "Requesting analysis map"
            );

            let url = self.request_url(token);
            let body = self
                .http
                .post_json(&url, Self::request_body(&bounds, kind))
                .await
                .map_err(HttpError::redacted)?;
            let result: MapToken = decode_json(&self.endpoint, &body)?;

            if result.map_id.trim().is_empty() || result.token.trim().is_empty() {
                return Err(AnalysisError::InvalidResponse(
                    "empty mapId or token".to_string(),
                ));
            }

            info!(analysis = kind.id(), map_id = %result.map_id, "Analysis map ready");
            Ok(result)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::tests::MockHttpClient;

    const ENDPOINT: &str = "https://ee.example.com/v1/maps";
    const TOKEN: &str = "ya29.test-access-token";

    fn client(mock: Arc<MockHttpClient>) -> EarthEngineClient {
        EarthEngineClient::new(
            mock,
            ENDPOINT,
            Credential::new("satellite_key", Some(TOKEN.to_string())),
        )
    }

    fn nairobi() -> Bounds {
        Bounds::new(-1.0, -1.6, 37.2, 36.5)
    }

    #[tokio::test]
    async fn test_compute_map() {
        let mock = Arc::new(MockHttpClient::ok(
            r#"{"mapId":"abc123","token":"xyz"}"#,
        ));
        let result = client(Arc::clone(&mock))
            .compute_map(nairobi(), AnalysisKind::Ndvi)
            .await
            .unwrap();

        assert_eq!(result.map_id, "abc123");
        assert_eq!(result.token, "xyz");

        let requests = mock.requests.lock();
        let (url, body) = &requests[0];
        assert_eq!(url, &format!("{}?access_token={}", ENDPOINT, TOKEN));
        let body = body.as_ref().unwrap();
        assert_eq!(body["analysis"], "ndvi");
        assert_eq!(body["region"]["north"], -1.0);
        assert_eq!(body["spec"]["bands"][0], "B8");
    }

    #[tokio::test]
    async fn test_accepts_legacy_mapid_field() {
        let mock = Arc::new(MockHttpClient::ok(r#"{"mapid":"abc","token":"xyz"}"#));
        let result = client(mock)
            .compute_map(nairobi(), AnalysisKind::Rainfall)
            .await
            .unwrap();
        assert_eq!(result.map_id, "abc");
    }

    #[tokio::test]
    async fn test_rejects_inverted_bounds() {
        let mock = Arc::new(MockHttpClient::ok("{}"));
        let err = client(Arc::clone(&mock))
            .compute_map(Bounds::new(-2.0, 1.0, 37.0, 36.0), AnalysisKind::Ndvi)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidBounds(_)));
        assert!(mock.requested_urls().is_empty());
    }

    #[tokio::test]
    async fn test_requires_credential() {
        let mock = Arc::new(MockHttpClient::ok("{}"));
        let client = EarthEngineClient::new(
            mock,
            ENDPOINT,
            Credential::missing("satellite_key"),
        );
        let err = client
            .compute_map(nairobi(), AnalysisKind::Ndvi)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn test_surfaces_http_failure() {
        let mock = Arc::new(MockHttpClient::err(HttpError::Status {
            url: ENDPOINT.to_string(),
            status: 403,
        }));
        let err = client(mock)
            .compute_map(nairobi(), AnalysisKind::Deforestation)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Http(HttpError::Status { status: 403, .. })));
    }

    #[tokio::test]
    async fn test_http_failure_masks_token() {
        let mock = Arc::new(MockHttpClient::err(HttpError::Request {
            url: format!("{}?access_token={}", ENDPOINT, TOKEN),
            reason: "connection refused".to_string(),
        }));
        let err = client(mock)
            .compute_map(nairobi(), AnalysisKind::Ndvi)
            .await
            .unwrap_err();
        assert!(!format!("{err} {err:?}").contains(TOKEN));
    }

    #[tokio::test]
    async fn test_rejects_empty_result() {
        let mock = Arc::new(MockHttpClient::ok(r#"{"mapId":"","token":""}"#));
        let err = client(mock)
            .compute_map(nairobi(), AnalysisKind::Ndvi)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidResponse(_)));
    }
}
