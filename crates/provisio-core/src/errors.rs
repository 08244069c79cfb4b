//! Unified error system for Provisio
//!
//! One error type is shared by every crate in the workspace. Variants follow
//! the provisioning failure taxonomy: input errors (claims, identity
//! provider, unknown account), configuration errors and directory
//! (backing-store) errors.

use serde::{Deserialize, Serialize};

/// Unified error type for all provisioning operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum ProvisionError {
    /// Claim set is malformed or carries an unparsable value
    #[error("Invalid claims: {message}")]
    InvalidClaims {
        /// Error message describing the offending claim
        message: String,
    },

    /// Identity provider could not be resolved
    #[error("Unknown provider: {message}")]
    UnknownProvider {
        /// Error message naming the provider
        message: String,
    },

    /// Account does not exist where one was required
    #[error("Unknown account: {message}")]
    UnknownAccount {
        /// Error message naming the account
        message: String,
    },

    /// Configuration value could not be parsed or validated
    #[error("Configuration error: {message}")]
    Config {
        /// Error message describing the configuration problem
        message: String,
    },

    /// Backing-store failure reported by the account directory
    #[error("Directory error: {message}")]
    Directory {
        /// Error message describing the storage failure
        message: String,
    },

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

impl ProvisionError {
    /// Create an invalid claims error
    pub fn invalid_claims(message: impl Into<String>) -> Self {
        Self::InvalidClaims {
            message: message.into(),
        }
    }

    /// Create an unknown provider error
    pub fn unknown_provider(message: impl Into<String>) -> Self {
        Self::UnknownProvider {
            message: message.into(),
        }
    }

    /// Create an unknown account error
    pub fn unknown_account(message: impl Into<String>) -> Self {
        Self::UnknownAccount {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a directory error
    pub fn directory(message: impl Into<String>) -> Self {
        Self::Directory {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// True for failures caused by the caller's input rather than the system.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidClaims { .. } | Self::UnknownProvider { .. } | Self::UnknownAccount { .. }
        )
    }
}

/// Standard Result type for provisioning operations
pub type Result<T> = std::result::Result<T, ProvisionError>;

impl From<std::io::Error> for ProvisionError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(err.to_string())
    }
}

impl From<serde_json::Error> for ProvisionError {
    fn from(err: serde_json::Error) -> Self {
        Self::config(format!("invalid JSON: {err}"))
    }
}

impl From<toml::de::Error> for ProvisionError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(format!("invalid TOML: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = ProvisionError::invalid_claims("changeTime is not a date");
        assert!(matches!(err, ProvisionError::InvalidClaims { .. }));
        assert_eq!(err.to_string(), "Invalid claims: changeTime is not a date");
    }

    #[test]
    fn test_input_error_classification() {
        assert!(ProvisionError::unknown_provider("Acme").is_input_error());
        assert!(ProvisionError::unknown_account("42").is_input_error());
        assert!(!ProvisionError::directory("connection reset").is_input_error());
        assert!(!ProvisionError::config("bad retention").is_input_error());
    }

    #[test]
    fn test_json_error_is_config_error() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(
            ProvisionError::from(err),
            ProvisionError::Config { .. }
        ));
    }
}
