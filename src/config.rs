use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::candidate::DEFAULT_COMMENT_MARKER;
use crate::error::{CrackError, Result};
use crate::password_generator::{DEFAULT_CHARSET, DEFAULT_MAX_LENGTH};
use crate::verifier::DEFAULT_TIMEOUT;

/// Tunables for a crack run. Every field can come from a JSON file;
/// missing fields take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrackConfig {
    /// Number of worker threads
    pub workers: usize,
    /// Task channel capacity; `None` means ten slots per worker
    pub queue_capacity: Option<usize>,
    /// Upper bound on one verification, in seconds
    pub timeout_secs: u64,
    /// Persist the checkpoint every N candidates emitted
    pub checkpoint_interval: u64,
    /// Log progress every N candidates emitted
    pub progress_interval: u64,
    /// Alphabet for combinatorial mode
    pub charset: String,
    /// Longest password tried in combinatorial mode
    pub max_length: usize,
    /// Wordlist lines starting with this are skipped
    pub comment_marker: String,
}

pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        * 2
}

impl Default for CrackConfig {
    fn default() -> Self {
        CrackConfig {
            workers: default_workers(),
            queue_capacity: None,
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            checkpoint_interval: 1000,
            progress_interval: 1000,
            charset: DEFAULT_CHARSET.to_string(),
            max_length: DEFAULT_MAX_LENGTH,
            comment_marker: DEFAULT_COMMENT_MARKER.to_string(),
        }
    }
}

impl CrackConfig {
    /// Load configuration from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        crate::io_utils::load_from_file(path).map_err(|source| CrackError::ConfigFile {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity.unwrap_or(self.workers * 10)
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(CrackError::InvalidConfig("workers must be at least 1".into()));
        }
        if self.queue_capacity == Some(0) {
            return Err(CrackError::InvalidConfig("queue_capacity must be at least 1".into()));
        }
        if self.timeout_secs == 0 {
            return Err(CrackError::InvalidConfig("timeout must be at least 1 second".into()));
        }
        if self.checkpoint_interval == 0 || self.progress_interval == 0 {
            return Err(CrackError::InvalidConfig(
                "checkpoint and progress intervals must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
