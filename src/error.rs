//! Error types for archive-cracker
//!
//! Only configuration-level problems are fatal. Per-candidate failures are
//! reported as outcomes, never as errors, and an unreadable checkpoint is
//! recovered locally as a fresh start.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type returned before or after a crack run
#[derive(Error, Debug)]
pub enum CrackError {
    /// The archive extension does not map to a supported tool
    #[error("Could not match extension '{extension}' of '{path}' (supported: .rar, .7z, .zip)")]
    UnrecognizedArchiveType { path: PathBuf, extension: String },

    /// The wordlist could not be opened or read
    #[error("Cannot read wordlist '{path}': {source}")]
    Wordlist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A configuration value is out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The JSON configuration file could not be loaded
    #[error("Cannot load config file '{path}': {source}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Worker pool errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Checkpoint file errors
#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("Cannot access checkpoint '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed checkpoint '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Worker thread errors
#[derive(Error, Debug, Clone)]
pub enum WorkerError {
    #[error("Worker {id} failed to start: {reason}")]
    SpawnFailed { id: usize, reason: String },

    #[error("Worker {id} panicked: {message}")]
    Panicked { id: usize, message: String },
}

/// Result type alias for crack operations
pub type Result<T> = std::result::Result<T, CrackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrecognized_extension_message() {
        let err = CrackError::UnrecognizedArchiveType {
            path: PathBuf::from("notes.tar"),
            extension: ".tar".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains(".tar"));
        assert!(msg.contains("notes.tar"));
    }

    #[test]
    fn test_worker_error_converts() {
        let err: CrackError = WorkerError::Panicked {
            id: 3,
            message: "boom".into(),
        }
        .into();
        assert!(matches!(err, CrackError::Worker(WorkerError::Panicked { id: 3, .. })));
    }
}
