//! API credential validation.
//!
//! Every provider and service credential is checked before the component
//! that needs it is attempted. Values copied from sample `.env` files
//! (`your_google_maps_api_key_here`) count as missing.

use std::fmt;

use thiserror::Error;

/// Minimum length of a credential that could plausibly be real.
pub const MIN_CREDENTIAL_LEN: usize = 10;

/// Literal values that are never real credentials.
const PLACEHOLDERS: &[&str] = &[
    "changeme",
    "change_me",
    "placeholder",
    "undefined",
    "null",
    "none",
    "todo",
    "secret",
    "api_key",
    "token",
];

/// Why a credential was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("{name} is not configured")]
    Missing { name: &'static str },

    #[error("{name} still contains a placeholder value")]
    Placeholder { name: &'static str },

    #[error("{name} is too short ({len} characters, need at least {min})")]
    TooShort {
        name: &'static str,
        len: usize,
        min: usize,
    },
}

/// A named secret that may or may not be configured.
///
/// `Debug` and `Display` never print the full value.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    name: &'static str,
    value: Option<String>,
}

impl Credential {
    pub fn new(name: &'static str, value: Option<String>) -> Self {
        Self { name, value }
    }

    /// A credential that was never configured.
    pub fn missing(name: &'static str) -> Self {
        Self { name, value: None }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the trimmed value if it passes validation.
    pub fn validate(&self) -> Result<&str, CredentialError> {
        let value = self
            .value
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(CredentialError::Missing { name: self.name })?;

        if is_placeholder(value) {
            return Err(CredentialError::Placeholder { name: self.name });
        }

        let len = value.chars().count();
        if len < MIN_CREDENTIAL_LEN {
            return Err(CredentialError::TooShort {
                name: self.name,
                len,
                min: MIN_CREDENTIAL_LEN,
            });
        }

        Ok(value)
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// First characters of the value followed by an ellipsis, for logs.
    pub fn masked(&self) -> String {
        match self.value.as_deref().map(str::trim) {
            None | Some("") => "(not set)".to_string(),
            Some(v) => mask_secret(v),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("name", &self.name)
            .field("value", &self.masked())
            .finish()
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.masked())
    }
}

/// Masked form of a secret: its first six characters and an ellipsis.
pub fn mask_secret(value: &str) -> String {
    let prefix: String = value.chars().take(6).collect();
    format!("{}...", prefix)
}

fn is_placeholder(value: &str) -> bool {
    let lower = value.to_lowercase();

    if PLACEHOLDERS.contains(&lower.as_str()) {
        return true;
    }
    if (lower.starts_with("your_") || lower.starts_with("your-") || lower.starts_with("<"))
        && (lower.ends_with("_here") || lower.ends_with("-here") || lower.ends_with('>'))
    {
        return true;
    }

    // xxxxxxxxxxxx, ************
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => chars.all(|c| c == first),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cred(value: &str) -> Credential {
        Credential::new("GOOGLE_MAPS_API_KEY", Some(value.to_string()))
    }

    #[test]
    fn test_missing_and_empty_are_rejected() {
        assert_eq!(
            Credential::missing("MAPBOX_ACCESS_TOKEN").validate(),
            Err(CredentialError::Missing {
                name: "MAPBOX_ACCESS_TOKEN"
            })
        );
        assert!(matches!(
            cred("").validate(),
            Err(CredentialError::Missing { .. })
        ));
        assert!(matches!(
            cred("   ").validate(),
            Err(CredentialError::Missing { .. })
        ));
    }

    #[test]
    fn test_placeholders_are_rejected() {
        for value in [
            "your_google_maps_api_key_here",
            "YOUR-MAPBOX-TOKEN-HERE",
            "<insert-key>",
            "xxxxxxxxxxxxxxxx",
            "changeme",
        ] {
            assert!(
                matches!(cred(value).validate(), Err(CredentialError::Placeholder { .. })),
                "{value} should be a placeholder"
            );
        }
    }

    #[test]
    fn test_short_values_are_rejected() {
        assert_eq!(
            cred("abc123").validate(),
            Err(CredentialError::TooShort {
                name: "GOOGLE_MAPS_API_KEY",
                len: 6,
                min: MIN_CREDENTIAL_LEN
            })
        );
    }

    #[test]
    fn test_real_looking_value_is_accepted_and_trimmed() {
        let c = cred("  AIzaSyA-1234567890abcdef  ");
        assert_eq!(c.validate(), Ok("AIzaSyA-1234567890abcdef"));
        assert!(c.is_valid());
    }

    #[test]
    fn test_debug_masks_value() {
        let c = cred("pk.eyJ1IjoiZXhhbXBsZSJ9.secret");
        let debug = format!("{:?}", c);
        assert!(debug.contains("pk.eyJ..."));
        assert!(!debug.contains("secret"));
        assert_eq!(Credential::missing("X").masked(), "(not set)");
    }

    #[test]
    fn test_mask_secret_matches_masked() {
        assert_eq!(mask_secret("AIzaSyTopSecret"), "AIzaSy...");
        assert_eq!(mask_secret("AIzaSyTopSecret"), cred("AIzaSyTopSecret").masked());
        assert_eq!(mask_secret("abc"), "abc...");
    }
}
