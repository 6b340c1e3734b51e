//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration loading, validation, and file selection.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Port value is outside valid range (1-65535).
    #[error("invalid port '{value}': must be between 1 and 65535")]
    InvalidPort { value: String },

    /// Port string could not be parsed as a number.
    #[error("failed to parse port '{value}': {source}")]
    PortParseError {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    /// Bind address string could not be parsed.
    #[error("failed to parse bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        #[source]
        source: std::net::AddrParseError,
    },

    /// Clip duration is not a positive finite number of seconds.
    #[error("invalid clip length '{value}': must be a positive number of seconds")]
    InvalidClipLen { value: String },

    /// A numeric setting could not be parsed.
    #[error("failed to parse {name} '{value}'")]
    InvalidNumber { name: &'static str, value: String },

    /// Selection policy name is not recognized.
    #[error("unknown selection policy '{value}' (expected 'first-sorted' or 'newest')")]
    InvalidPolicy { value: String },

    /// Specified path does not exist on the filesystem.
    #[error("path does not exist: {path}")]
    PathNotFound { path: PathBuf },

    /// Path exists but is not a file (when a file was expected).
    #[error("path is not a file: {path}")]
    NotAFile { path: PathBuf },

    /// Path exists but is not a directory (when a directory was expected).
    #[error("path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// No grounding checkpoint could be resolved.
    #[error("no checkpoint found in {dir}")]
    NoCheckpointFound { dir: PathBuf },

    /// Directory listing failed.
    #[error("failed to scan {dir}: {source}")]
    ScanFailed {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
