//! HTTP client abstraction for testability
//!
//! Every remote call the crate makes (SDK bundles, analysis requests,
//! environmental lookups) goes through [`HttpClient`] so tests can inject
//! canned responses.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::mask_secret;

/// Default timeout for HTTP requests in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Query parameters whose values are credentials.
const SECRET_PARAMS: &[&str] = &["key", "access_token", "token"];

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors returned by [`HttpClient`] implementations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpError {
    /// The request could not be sent or the connection failed.
    #[error("Request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// The request exceeded the client timeout.
    #[error("Request to {url} timed out")]
    Timeout { url: String },

    /// The body could not be read or decoded.
    #[error("Invalid response from {url}: {reason}")]
    Body { url: String, reason: String },

    /// The client itself could not be constructed.
    #[error("Failed to create HTTP client: {0}")]
    Client(String),
}

impl HttpError {
    /// Same error with any credential in its URL masked.
    pub fn redacted(self) -> Self {
        match self {
            HttpError::Request { url, reason } => HttpError::Request {
                url: redact_url(&url),
                reason,
            },
            HttpError::Status { url, status } => HttpError::Status {
                url: redact_url(&url),
                status,
            },
            HttpError::Timeout { url } => HttpError::Timeout {
                url: redact_url(&url),
            },
            HttpError::Body { url, reason } => HttpError::Body {
                url: redact_url(&url),
                reason,
            },
            HttpError::Client(reason) => HttpError::Client(reason),
        }
    }
}

/// Masks the values of `key`, `access_token` and `token` query parameters.
///
/// Every URL that reaches a log line or an error message goes through here.
/// Masking is idempotent.
pub fn redact_url(url: &str) -> String {
    let Some((base, rest)) = url.split_once('?') else {
        return url.to_string();
    };
    let (query, fragment) = match rest.split_once('#') {
        Some((q, f)) => (q, Some(f)),
        None => (rest, None),
    };

    let params: Vec<String> = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((name, value))
                if !value.is_empty()
                    && SECRET_PARAMS.iter().any(|p| p.eq_ignore_ascii_case(name)) =>
            {
                format!("{}={}", name, mask_secret(value))
            }
            _ => pair.to_string(),
        })
        .collect();

    let mut redacted = format!("{}?{}", base, params.join("&"));
    if let Some(fragment) = fragment {
        redacted.push('#');
        redacted.push_str(fragment);
    }
    redacted
}

/// Trait for HTTP client operations.
///
/// This abstraction allows for dependency injection and easier testing
/// by enabling mock HTTP clients in tests.
pub trait HttpClient: Send + Sync {
    /// Performs an HTTP GET request and returns the response body.
    fn get(&self, url: &str) -> BoxFuture<'_, Result<Vec<u8>, HttpError>>;

    /// Performs an HTTP POST with a JSON body and returns the response body.
    fn post_json(
        &self,
        url: &str,
        body: serde_json::Value,
    ) -> BoxFuture<'_, Result<Vec<u8>, HttpError>>;
}

/// Decodes a JSON response body.
pub fn decode_json<T: DeserializeOwned>(url: &str, body: &[u8]) -> Result<T, HttpError> {
    serde_json::from_slice(body).map_err(|e| HttpError::Body {
        url: redact_url(url),
        reason: e.to_string(),
    })
}

/// Real HTTP client implementation using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a new ReqwestClient with default configuration.
    pub fn new() -> Result<Self, HttpError> {
        Self::with_timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a new ReqwestClient with custom timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HttpError::Client(e.to_string()))?;

        Ok(Self { client })
    }

    fn map_send_error(url: &str, e: reqwest::Error) -> HttpError {
        let timed_out = e.is_timeout();
        // reqwest errors embed the request URL
        let reason = e.without_url().to_string();
        if timed_out {
            HttpError::Timeout {
                url: redact_url(url),
            }
        } else {
            HttpError::Request {
                url: redact_url(url),
                reason,
            }
        }
    }

    async fn read_body(url: &str, response: reqwest::Response) -> Result<Vec<u8>, HttpError> {
        if !response.status().is_success() {
            return Err(HttpError::Status {
                url: redact_url(url),
                status: response.status().as_u16(),
            });
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| HttpError::Body {
                url: redact_url(url),
                reason: e.without_url().to_string(),
            })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> BoxFuture<'_, Result<Vec<u8>, HttpError>> {
        let url = url.to_string();
        Box::pin(async move {
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| Self::map_send_error(&url, e))?;
            Self::read_body(&url, response).await
        })
    }

    fn post_json(
        &self,
        url: &str,
        body: serde_json::Value,
    ) -> BoxFuture<'_, Result<Vec<u8>, HttpError>> {
        let url = url.to_string();
        Box::pin(async move {
            let response = self
                .client
                .post(&url)
                .json(&body)
                .send()
                .await
                .map_err(|e| Self::map_send_error(&url, e))?;
            Self::read_body(&url, response).await
        })
    }
}
