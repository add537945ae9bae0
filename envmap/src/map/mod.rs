//! Provider selection and the caller-owned map handle.
//!
//! [`MapInitializer::initialize`] walks the configured provider order,
//! swallowing each provider's failure and moving on, and only fails when no
//! provider could produce a map.

mod handle;
mod initializer;

pub use handle::MapHandle;
pub use initializer::{MapInitializer, MapOptions};

use thiserror::Error;

use crate::provider::ProviderError;

/// Errors surfaced by map initialization and handle operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MapError {
    /// Every provider in the attempt order was unavailable.
    #[error("No map provider available ({})", summarize(.attempts))]
    InitFailed { attempts: Vec<ProviderError> },

    /// An operation on an initialized map failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

fn summarize(attempts: &[ProviderError]) -> String {
    if attempts.is_empty() {
        return "no providers configured".to_string();
    }
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderKind;

    #[test]
    fn test_init_failed_lists_attempts() {
        let err = MapError::InitFailed {
            attempts: vec![
                ProviderError::unavailable(ProviderKind::Primary, "credential primary_key is not set"),
                ProviderError::unavailable(ProviderKind::Fallback, "credential fallback_key is not set"),
            ],
        };
        let text = err.to_string();
        assert!(text.starts_with("No map provider available"));
        assert!(text.contains("primary provider unavailable"));
        assert!(text.contains("fallback provider unavailable"));
    }

    #[test]
    fn test_init_failed_without_attempts() {
        let err = MapError::InitFailed { attempts: vec![] };
        assert_eq!(err.to_string(), "No map provider available (no providers configured)");
    }
}
