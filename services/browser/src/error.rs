use thiserror::Error;

/// Errors produced by the browser core
///
/// Only [`BrowserError::is_reportable`] kinds are meant for a human. The
/// others are absorbed by the resolvers and turned into `Missing`/`Absent`
/// values so that one bad sample never stops the rest of a page.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrowserError {
    #[error("Object store unavailable during {operation}: {message}")]
    StoreUnavailable {
        operation: &'static str,
        message: String,
    },

    #[error("Malformed metadata at {key}: {message}")]
    MalformedMetadata { key: String, message: String },

    #[error("Malformed object key: {0}")]
    MalformedKey(String),

    #[error("Failed to sign URL for {key}: {message}")]
    SigningFailed { key: String, message: String },

    #[error("Missing required configuration: {0}")]
    ConfigurationMissing(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidConfiguration { key: String, message: String },
}

impl BrowserError {
    pub fn store_unavailable(operation: &'static str, err: impl std::fmt::Display) -> Self {
        BrowserError::StoreUnavailable {
            operation,
            message: err.to_string(),
        }
    }

    /// Whether this error should be shown to a person rather than absorbed
    pub fn is_reportable(&self) -> bool {
        matches!(
            self,
            BrowserError::StoreUnavailable { .. }
                | BrowserError::ConfigurationMissing(_)
                | BrowserError::InvalidConfiguration { .. }
        )
    }

    /// Stable machine-readable code used by the HTTP API
    pub fn code(&self) -> &'static str {
        match self {
            BrowserError::StoreUnavailable { .. } => "STORE_UNAVAILABLE",
            BrowserError::MalformedMetadata { .. } => "MALFORMED_METADATA",
            BrowserError::MalformedKey(_) => "MALFORMED_KEY",
            BrowserError::SigningFailed { .. } => "SIGNING_FAILED",
            BrowserError::ConfigurationMissing(_) => "CONFIGURATION_MISSING",
            BrowserError::InvalidConfiguration { .. } => "INVALID_CONFIGURATION",
        }
    }
}
