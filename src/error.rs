//! Error types for podcast-dl
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error types (Database, Network, feed validation)
//! - Control-flow signals (`NotModified`, `Aborted`) that are matched
//!   by name at their single consumer and never surface to callers of
//!   the processor's public API

use crate::feed::FeedInfo;
use thiserror::Error;

/// Result type alias for podcast-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for podcast-dl
///
/// This is the primary error type used throughout the library. Each variant includes
/// contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "filename_template")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-success HTTP status received for a request
    #[error("received HTTP {status} from {url}")]
    HttpStatus {
        /// The HTTP status code returned by the server
        status: u16,
        /// The URL that produced the status
        url: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The feed has not changed since the last fetch (control-flow signal, not a failure)
    ///
    /// Carries the cached feed info so the caller can keep reporting
    /// show metadata without re-parsing anything.
    #[error("feed is unchanged")]
    NotModified(Box<FeedInfo>),

    /// The resource is neither a feed nor discoverable as one
    #[error("not a supported feed: {0}")]
    NotSupported(String),

    /// The document parsed but did not yield a usable feed
    #[error("invalid feed: {0}")]
    InvalidFeed(String),

    /// A feed item had no link qualifying as downloadable media
    #[error("episode has no usable enclosure: {0}")]
    MissingEnclosure(String),

    /// Download was cancelled cooperatively (control-flow signal, not a failure)
    #[error("download aborted")]
    Aborted,

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Shutdown in progress - not accepting new work
    #[error("shutdown in progress: not accepting new work")]
    ShuttingDown,
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),
}
