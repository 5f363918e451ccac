//! Error taxonomy.
//!
//! Library code returns typed errors; `anyhow` appears only at the binary
//! edge. Nothing here is fatal to the process — every store failure is scoped
//! to the command that triggered it.

use std::path::PathBuf;

use thiserror::Error;

/// Failures talking to the hosted record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached or answered with a server error.
    #[error("record store unavailable: {0}")]
    Unavailable(String),

    /// No record with this id exists in the collection (stale id).
    #[error("no record '{id}' in '{collection}'")]
    NotFound { collection: String, id: String },

    /// A document did not round-trip through the expected shape.
    #[error("record serialization failed: {0}")]
    Serialization(String),

    /// Missing session or rejected credentials.
    #[error("not signed in: {0}")]
    Auth(String),
}

impl StoreError {
    pub fn not_found(collection: &str, id: &str) -> Self {
        Self::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    /// True when a later retry could plausibly succeed. Drives outbox
    /// retention in the activity log.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Configuration resolution failures. These are the only errors that abort
/// startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Failures while producing the JSON export file.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to serialize export document: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write export file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}
