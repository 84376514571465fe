use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::CheckpointError;

/// Resumable progress for one archive.
///
/// `current_line` is a floor: every candidate below it has been verified.
/// A non-empty `password` means the search already succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointState {
    #[serde(default)]
    pub current_line: u64,
    #[serde(default)]
    pub password: String,
}

impl CheckpointState {
    pub fn new(current_line: u64) -> Self {
        CheckpointState {
            current_line,
            password: String::new(),
        }
    }

    /// State recorded once a candidate has been verified
    pub fn found(line: u64, password: &str) -> Self {
        CheckpointState {
            current_line: line,
            password: password.to_string(),
        }
    }

    pub fn found_password(&self) -> Option<&str> {
        if self.password.is_empty() {
            None
        } else {
            Some(&self.password)
        }
    }
}

/// JSON checkpoint file stored next to the archive
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CheckpointStore { path: path.into() }
    }

    /// Store whose file sits next to the archive.
    ///
    /// # Arguments
    ///
    /// * `archive` - Path of the archive being cracked
    ///
    /// # Examples
    ///
    /// ```
    /// use archive_cracker::CheckpointStore;
    /// use std::path::Path;
    ///
    /// let store = CheckpointStore::for_archive(Path::new("backups/secret.zip"));
    /// assert_eq!(store.path(), Path::new("backups/secret.zip_status.json"));
    /// ```
    pub fn for_archive(archive: &Path) -> Self {
        let mut name = archive.as_os_str().to_os_string();
        name.push("_status.json");
        CheckpointStore::new(name)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the checkpoint.
    ///
    /// # Returns
    ///
    /// `Ok(Some(state))` if the file was read, `Ok(None)` if there is no
    /// checkpoint yet, `Err(CheckpointError)` if it exists but cannot be read
    /// or parsed. Missing fields default to `0` and `""`.
    ///
    /// # Examples
    ///
    /// ```
    /// use archive_cracker::CheckpointStore;
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let store = CheckpointStore::new(dir.path().join("secret.rar_status.json"));
    /// assert_eq!(store.load().unwrap(), None);
    ///
    /// std::fs::write(store.path(), r#"{"current_line": 42}"#).unwrap();
    /// let state = store.load().unwrap().unwrap();
    /// assert_eq!(state.current_line, 42);
    /// assert_eq!(state.found_password(), None);
    /// ```
    pub fn load(&self) -> Result<Option<CheckpointState>, CheckpointError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(CheckpointError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_reader(BufReader::new(file))
            .map(Some)
            .map_err(|source| CheckpointError::Parse {
                path: self.path.clone(),
                source,
            })
    }

    /// Read the checkpoint, falling back to a fresh state when it is
    /// missing or cannot be read
    pub fn load_or_fresh(&self) -> CheckpointState {
        match self.load() {
            Ok(Some(state)) => state,
            Ok(None) => CheckpointState::default(),
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable checkpoint, starting fresh");
                CheckpointState::default()
            }
        }
    }

    /// Atomically replace the checkpoint file with `state`.
    ///
    /// The JSON is written to a temporary file next to the target and renamed
    /// over it, so readers never see a partial file.
    ///
    /// # Arguments
    ///
    /// * `state` - Floor and password to persist
    ///
    /// # Returns
    ///
    /// `Ok(())` if the save succeeded, `Err(CheckpointError::Io)` if it failed
    ///
    /// # Examples
    ///
    /// ```
    /// use archive_cracker::{CheckpointState, CheckpointStore};
    ///
    /// let dir = tempfile::tempdir().unwrap();
    /// let store = CheckpointStore::new(dir.path().join("secret.7z_status.json"));
    /// store.save(&CheckpointState::found(7, "hunter2")).unwrap();
    ///
    /// let state = store.load().unwrap().unwrap();
    /// assert_eq!(state.found_password(), Some("hunter2"));
    /// assert_eq!(state.current_line, 7);
    /// ```
    pub fn save(&self, state: &CheckpointState) -> Result<(), CheckpointError> {
        crate::io_utils::save_to_file(state, &self.path).map_err(|source| CheckpointError::Io {
            path: self.path.clone(),
            source,
        })
    }
}
