//! Structured error types for settings resolution.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Error codes for programmatic error handling (`check --format json`).
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Binding errors
    CoercionFailed,
    MissingBinding,
    EnvFileUnreadable,

    // Profile selection
    MissingProfile,
    UnknownProfile,

    // Consistency errors
    InconsistentSettings,
    UnknownKey,
    DecodeFailed,
}

/// Fatal configuration error. Every variant aborts process startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A binding is present but does not satisfy its declared coercion.
    #[error("{key}: cannot parse {value:?} as {expected}")]
    Coercion {
        key: String,
        value: String,
        expected: &'static str,
    },

    /// A binding has no value and no default.
    #[error("{key} is required: {reason}")]
    MissingBinding { key: String, reason: String },

    /// No overlay selector was supplied.
    #[error("no settings profile selected; set PRIMEPASS_SETTINGS or pass --settings")]
    MissingProfile,

    /// The overlay selector names an unrecognized profile.
    #[error("unknown settings profile '{0}' (expected development or production)")]
    UnknownProfile(String),

    /// Two or more settings contradict each other.
    #[error("{key}: {reason}")]
    Inconsistent { key: String, reason: String },

    /// An overlay operation targets a key whose parent does not exist.
    #[error("overlay targets unknown key {0}")]
    UnknownKey(String),

    /// The merged document no longer fits the settings schema.
    #[error("resolved settings do not match the schema: {0}")]
    Decode(#[from] serde_json::Error),

    /// The `.env` file exists but could not be read or parsed.
    #[error("cannot read env file {}: {source}", path.display())]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenvy::Error,
    },
}

impl ConfigError {
    pub fn coercion(key: &str, value: &str, expected: &'static str) -> Self {
        Self::Coercion {
            key: key.to_string(),
            value: value.to_string(),
            expected,
        }
    }

    pub fn missing(key: &str, reason: impl Into<String>) -> Self {
        Self::MissingBinding {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn inconsistent(key: &str, reason: impl Into<String>) -> Self {
        Self::Inconsistent {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ConfigError::Coercion { .. } => ErrorCode::CoercionFailed,
            ConfigError::MissingBinding { .. } => ErrorCode::MissingBinding,
            ConfigError::MissingProfile => ErrorCode::MissingProfile,
            ConfigError::UnknownProfile(_) => ErrorCode::UnknownProfile,
            ConfigError::Inconsistent { .. } => ErrorCode::InconsistentSettings,
            ConfigError::UnknownKey(_) => ErrorCode::UnknownKey,
            ConfigError::Decode(_) => ErrorCode::DecodeFailed,
            ConfigError::EnvFile { .. } => ErrorCode::EnvFileUnreadable,
        }
    }

    /// The setting or binding this error is about, when there is one.
    pub fn key(&self) -> Option<&str> {
        match self {
            ConfigError::Coercion { key, .. }
            | ConfigError::MissingBinding { key, .. }
            | ConfigError::Inconsistent { key, .. } => Some(key),
            ConfigError::UnknownKey(key) => Some(key),
            _ => None,
        }
    }
}

/// Serializable diagnostic for a failed resolution.
#[derive(Debug, Serialize)]
pub struct Diagnostic {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl From<&ConfigError> for Diagnostic {
    fn from(err: &ConfigError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
            key: err.key().map(str::to_string),
        }
    }
}

/// Result type for settings resolution.
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coercion_message_names_key() {
        let err = ConfigError::coercion("CACHE_TTL", "notanumber", "an integer");
        assert_eq!(
            err.to_string(),
            "CACHE_TTL: cannot parse \"notanumber\" as an integer"
        );
        assert_eq!(err.key(), Some("CACHE_TTL"));
        assert_eq!(err.code(), ErrorCode::CoercionFailed);
    }

    #[test]
    fn test_diagnostic_serializes_code() {
        let err = ConfigError::UnknownProfile("staging".into());
        let diag = Diagnostic::from(&err);
        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["code"], "UNKNOWN_PROFILE");
        assert!(json.get("key").is_none());
    }
}
