//! Load-state and error types for the script loader.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::http::{redact_url, HttpError};

/// Loading progress of one remote SDK bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadStatus {
    /// No load has been attempted.
    Unloaded,
    /// A load is in flight; new callers attach to it.
    Loading,
    /// The bundle is present for the rest of the process lifetime.
    Loaded,
    /// The load failed or timed out.
    Failed,
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoadStatus::Unloaded => "unloaded",
            LoadStatus::Loading => "loading",
            LoadStatus::Loaded => "loaded",
            LoadStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Point-in-time view of one registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadState {
    pub url: String,
    pub status: LoadStatus,
}

/// Errors that can occur while loading a remote bundle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The fetch itself failed.
    #[error("Failed to load {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// The bounded wait expired before the load settled.
    #[error("Timed out after {}s waiting for {url}", timeout.as_secs())]
    Timeout { url: String, timeout: Duration },

    /// The server returned an empty bundle.
    #[error("Empty bundle returned for {url}")]
    EmptyBundle { url: String },
}

impl LoadError {
    /// URL of the bundle that failed.
    pub fn url(&self) -> &str {
        match self {
            LoadError::Fetch { url, .. }
            | LoadError::Timeout { url, .. }
            | LoadError::EmptyBundle { url } => url,
        }
    }

    /// Same error with any credential in its URL masked.
    pub fn redacted(self) -> Self {
        match self {
            LoadError::Fetch { url, reason } => LoadError::Fetch {
                url: redact_url(&url),
                reason,
            },
            LoadError::Timeout { url, timeout } => LoadError::Timeout {
                url: redact_url(&url),
                timeout,
            },
            LoadError::EmptyBundle { url } => LoadError::EmptyBundle {
                url: redact_url(&url),
            },
        }
    }

    /// Returns true for the bounded-wait case.
    pub fn is_timeout(&self) -> bool {
        matches!(self, LoadError::Timeout { .. })
    }
}

impl From<HttpError> for LoadError {
    fn from(e: HttpError) -> Self {
        let e = e.redacted();
        match e {
            HttpError::Timeout { url } => LoadError::Fetch {
                url,
                reason: "request timed out".to_string(),
            },
            HttpError::Request { ref url, .. }
            | HttpError::Status { ref url, .. }
            | HttpError::Body { ref url, .. } => LoadError::Fetch {
                url: url.clone(),
                reason: e.to_string(),
            },
            HttpError::Client(reason) => LoadError::Fetch {
                url: String::new(),
                reason,
            },
        }
    }
}

/// What a failed load means for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPolicy {
    /// Failures are reported as [`LoadOutcome::Degraded`] so dependent
    /// features keep running without the bundle.
    #[default]
    FailOpen,
    /// Failures are returned as errors.
    FailClosed,
}

impl LoadPolicy {
    /// Parse from a configuration string.
    pub fn from_config_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "fail_open" | "fail-open" | "open" => Some(LoadPolicy::FailOpen),
            "fail_closed" | "fail-closed" | "closed" => Some(LoadPolicy::FailClosed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LoadPolicy::FailOpen => "fail_open",
            LoadPolicy::FailClosed => "fail_closed",
        }
    }
}

/// Result of a load under [`LoadPolicy::FailOpen`].
///
/// A resolved load does not imply the bundle is usable: `Degraded`
/// carries the failure that was swallowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    Degraded(LoadError),
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_from_config_str() {
        assert_eq!(
            LoadPolicy::from_config_str("fail_open"),
            Some(LoadPolicy::FailOpen)
        );
        assert_eq!(
            LoadPolicy::from_config_str("Fail-Closed"),
            Some(LoadPolicy::FailClosed)
        );
        assert_eq!(LoadPolicy::from_config_str("maybe"), None);
        assert_eq!(LoadPolicy::default(), LoadPolicy::FailOpen);
    }

    #[test]
    fn test_timeout_error_display() {
        let err = LoadError::Timeout {
            url: "https://sdk.example/a.js".to_string(),
            timeout: Duration::from_secs(15),
        };
        assert!(err.is_timeout());
        assert_eq!(err.url(), "https://sdk.example/a.js");
        assert!(err.to_string().contains("15s"));
    }

    #[test]
    fn test_from_http_status() {
        let err: LoadError = HttpError::Status {
            url: "https://sdk.example/a.js".to_string(),
            status: 404,
        }
        .into();
        assert_eq!(err.url(), "https://sdk.example/a.js");
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn test_from_http_masks_key() {
        let err: LoadError = HttpError::Request {
            url: "https://maps.example/js?key=AIzaSyPrivate0123".to_string(),
            reason: "connection reset".to_string(),
        }
        .into();
        assert_eq!(err.url(), "https://maps.example/js?key=AIzaSy...");
        assert!(!err.to_string().contains("Private0123"));
    }
}
