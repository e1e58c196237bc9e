//! Error types and Result aliases for dirsearch.
//!
//! This module defines the error hierarchy used throughout the crate.
//! All public functions return `Result<T, Error>` or `Result<T>`.

use thiserror::Error;

/// Result type alias using dirsearch's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for dirsearch operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Full-text index error.
    #[error("index error: {0}")]
    Index(#[from] IndexError),

    /// File watching error.
    #[error("watcher error: {0}")]
    Watcher(#[from] WatcherError),

    /// Query error.
    #[error("search error: {0}")]
    Search(#[from] SearchError),

    /// Server/API error.
    #[error("server error: {0}")]
    Server(#[from] ServerError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Index store errors.
#[derive(Error, Debug)]
pub enum IndexError {
    /// The index location could not be opened or created.
    #[error("failed to open index at '{path}': {reason}")]
    Open { path: String, reason: String },

    /// The on-disk schema is missing a required field.
    #[error("schema error: {0}")]
    Schema(String),

    /// Writing (upsert, delete, commit) failed.
    #[error("write error: {0}")]
    Write(String),

    /// Reading from the index failed.
    #[error("read error: {0}")]
    Read(String),
}

/// File watcher errors.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Failed to watch path.
    #[error("failed to watch path '{path}': {reason}")]
    WatchFailed { path: String, reason: String },

    /// Failed to walk a directory tree.
    #[error("failed to walk '{path}': {reason}")]
    WalkFailed { path: String, reason: String },

    /// Inclusion pattern did not compile.
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// The notification backend failed.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Query errors.
#[derive(Error, Debug)]
pub enum SearchError {
    /// The query text could not be parsed.
    #[error("invalid query '{query}': {reason}")]
    InvalidQuery { query: String, reason: String },

    /// The engine failed while executing a query.
    #[error("execution error: {0}")]
    Execution(String),
}

/// Server/API errors.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Failed to bind to address.
    #[error("failed to bind to {address}: {reason}")]
    BindFailed { address: String, reason: String },

    /// Request handling error.
    #[error("request error: {0}")]
    Request(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl IndexError {
    /// Create an open error for a location.
    pub fn open(path: impl AsRef<std::path::Path>, reason: impl ToString) -> Self {
        Self::Open {
            path: path.as_ref().display().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl WatcherError {
    /// Create a watch failure for a path.
    pub fn watch_failed(path: impl AsRef<std::path::Path>, reason: impl ToString) -> Self {
        Self::WatchFailed {
            path: path.as_ref().display().to_string(),
            reason: reason.to_string(),
        }
    }
}
