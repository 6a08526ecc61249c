//! Domain-specific error types for periscan.
//!
//! Uses `thiserror` for ergonomic error definitions that integrate
//! with the broader `anyhow` error handling strategy.

use thiserror::Error;

/// Errors produced while normalizing upstream timestamp strings.
///
/// A failed normalization is record-local: callers drop the offending
/// record and keep going, they never abort the batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimestampError {
    #[error("Timestamp '{0}' matched no known format")]
    Unparseable(String),
}

/// Errors that can occur while loading a capture stats file.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read stats file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse stats file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors that can occur while constructing collaborator lookups.
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("Failed to read indicator file '{path}': {source}")]
    IndicatorRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse indicator file '{path}': {source}")]
    IndicatorParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type alias using anyhow for application-level error handling.
pub type Result<T> = anyhow::Result<T>;
