//! Crate error type.

use std::io;

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, FdwError>;

/// Boxed error surfaced by a storage client implementation.
pub type StorageSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while binding a table or executing a fetch.
///
/// Planning itself never fails; everything here comes from configuration,
/// worker start-up, or the storage client.
#[derive(Debug, Error)]
pub enum FdwError {
    /// The storage client failed to serve a page. Displayed verbatim.
    #[error("{0}")]
    Storage(StorageSource),
    /// A required table option was not supplied.
    #[error("table option '{0}' is required")]
    MissingOption(&'static str),
    /// A table option could not be parsed or is out of range.
    #[error("invalid value for table option '{option}': {reason}")]
    InvalidOption {
        /// Option key.
        option: &'static str,
        /// Human readable explanation.
        reason: String,
    },
    /// Column options describe an impossible key topology.
    #[error("invalid key topology: {0}")]
    InvalidTopology(String),
    /// A parallel scan worker thread could not be started.
    #[error("failed to spawn scan worker for segment {segment}: {source}")]
    WorkerSpawn {
        /// Segment the worker was meant to own.
        segment: u32,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
    /// The tracing subscriber could not be installed.
    #[error("logging setup failed: {0}")]
    Logging(String),
    /// I/O error outside of the storage client.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// JSON (de)serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// TOML table description could not be parsed.
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl FdwError {
    /// Wraps an arbitrary storage client error.
    pub fn storage<E>(err: E) -> Self
    where
        E: Into<StorageSource>,
    {
        FdwError::Storage(err.into())
    }

    pub(crate) fn invalid_option(option: &'static str, reason: impl Into<String>) -> Self {
        FdwError::InvalidOption {
            option,
            reason: reason.into(),
        }
    }

    /// Returns `true` when the error originated in the storage client.
    pub fn is_storage(&self) -> bool {
        matches!(self, FdwError::Storage(_))
    }
}
