//! Error types for the HICC dashboard.

use std::time::Duration;
use thiserror::Error;

/// Setup errors - fatal, abort initialization.
#[derive(Debug, Error)]
pub enum SetupError {
    /// Two widgets were registered under the same id.
    #[error("Widget '{0}' is already registered")]
    DuplicateWidgetId(String),

    /// A sync backend needs a navigation capability the host does not offer.
    #[error("{sync} requires {library}")]
    MissingRequiredExternalLibrary {
        sync: &'static str,
        library: &'static str,
    },

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Request errors - reported to error hooks, never returned from a request cycle.
#[derive(Debug, Clone, Error)]
pub enum RequestError {
    /// The request could not be sent or the connection failed.
    #[error("Network error: {0}")]
    Network(String),

    /// The backend answered with a non-success status.
    #[error("Search backend returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The payload was not the JSON document we expected.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// No answer within the configured timeout.
    #[error("Request timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// The manager could not be initialized before the request.
    #[error("Manager setup failed: {0}")]
    Setup(String),
}

/// External state errors - recovered by treating the state as empty.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// A pair with no `=` or with an empty name.
    #[error("Malformed parameter pair: '{0}'")]
    MalformedPair(String),

    /// A `{!` local-parameter block that is never closed or has a bad entry.
    #[error("Malformed local parameters in '{0}'")]
    MalformedLocals(String),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No config directory found.
    #[error("Config directory not found")]
    NoConfigDir,

    /// IO error.
    #[error("IO error: {0}")]
    Io(String),

    /// Parse error.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A value parsed but is not usable.
    #[error("Invalid config: {0}")]
    Invalid(String),
}
