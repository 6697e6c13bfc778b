//! Error types for Tunemark

use std::io;
use thiserror::Error;

/// Result type alias for Tunemark operations
pub type Result<T> = std::result::Result<T, TunemarkError>;

/// Main error type for Tunemark
#[derive(Error, Debug)]
pub enum TunemarkError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Snapshot file could not be read or written
    #[error("Snapshot storage error: {0}")]
    SnapshotStorage(String),

    /// Revert requested but no snapshot exists
    #[error("No safety snapshot found")]
    SnapshotNotFound,

    /// A single mutation action failed
    #[error("Tweak action failed: {0}")]
    TweakAction(String),

    /// Hardware profile query failed (builder substitutes defaults instead
    /// of surfacing this)
    #[error("Profile build error: {0}")]
    ProfileBuild(String),

    /// Process-related error (telemetry termination)
    #[error("Process error: {0}")]
    Process(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Unsupported platform for a host mutation
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}
