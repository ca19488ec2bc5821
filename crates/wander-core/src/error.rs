//! Core error types for wander-core.
//!
//! The hierarchy mirrors how each failure is handled: `InvalidParameters` is
//! surfaced to the caller, while routing, location and notification failures
//! are transient and only ever logged by the session runtime.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for wander-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Journey or coordinate parameters rejected at construction time
    #[error("Invalid parameters: {0}")]
    InvalidParameters(#[from] ValidationError),

    /// The routing collaborator could not produce an estimate
    #[error("Routing unavailable: {0}")]
    RoutingUnavailable(#[from] RoutingError),

    /// No position is known, or location authorization was revoked
    #[error("Location unavailable: {0}")]
    LocationUnavailable(String),

    /// The notification collaborator refused a request
    #[error("Notification scheduling failed: {0}")]
    NotificationSchedulingFailed(#[from] NotificationError),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Total duration must be strictly positive
    #[error("total duration must be greater than zero (got {0}s)")]
    NonPositiveDuration(i64),

    /// Buffer must not be negative
    #[error("buffer must not be negative (got {0}s)")]
    NegativeBuffer(i64),

    /// Duration or buffer beyond the supported range
    #[error("{field} out of range: {value}s exceeds {max}s")]
    DurationOutOfRange {
        field: &'static str,
        value: i64,
        max: i64,
    },

    /// Latitude or longitude outside the WGS-84 range
    #[error("coordinate out of range: latitude {latitude}, longitude {longitude}")]
    CoordinateOutOfRange { latitude: f64, longitude: f64 },

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Failures reported by a routing collaborator.
#[derive(Error, Debug)]
pub enum RoutingError {
    /// Transport-level failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("routing server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Server answered but found no route between the points
    #[error("no route found ({code})")]
    NoRoute { code: String },

    /// Response body did not have the expected shape
    #[error("invalid routing response: {0}")]
    InvalidResponse(String),

    /// Request did not complete within the configured timeout
    #[error("routing request timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// Collaborator-specific failure
    #[error("{0}")]
    Unavailable(String),
}

/// Failures reported by a notification collaborator.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NotificationError {
    /// The collaborator refused the request
    #[error("notification '{id}' rejected: {message}")]
    Rejected { id: String, message: String },

    /// Notification permission has not been granted
    #[error("notification permission denied")]
    PermissionDenied,

    /// No runtime is available to deliver scheduled notifications
    #[error("notification runtime unavailable: {0}")]
    RuntimeUnavailable(String),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// Stored value could not be decoded
    #[error("Corrupt record under '{key}': {message}")]
    CorruptRecord { key: String, message: String },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown dot-path key
    #[error("unknown config key: {0}")]
    UnknownKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Home directory could not be determined or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
