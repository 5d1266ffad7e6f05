use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{StorageError, StorageResult};

/// Environment variable naming the directory that holds the JSON documents.
pub const DATA_DIR_ENV: &str = "BLINDVOTE_DATA_DIR";

pub const ROLES_FILE: &str = "roles.json";
pub const VOTES_FILE: &str = "votes.json";
pub const CONFIG_FILE: &str = "config.json";

/// JsonConnection manages the data directory, document paths, and the
/// per-document critical sections for the file backend.
///
/// Whole-document read-modify-write is not safe under concurrent writers, so
/// every mutating repository call acquires the named lock for its document
/// and holds it for the full load-modify-rewrite cycle. The guard is
/// released on all exit paths, including errors. Readers run lock-free:
/// writes land via temp-file-then-rename, so a reader never observes a
/// partially written document.
pub struct JsonConnection {
    base_directory: PathBuf,
    roles_lock: Mutex<()>,
    votes_lock: Mutex<()>,
    config_lock: Mutex<()>,
}

impl JsonConnection {
    /// Create a connection over the given data directory, creating it if
    /// needed.
    pub fn new<P: AsRef<Path>>(base_directory: P) -> StorageResult<Self> {
        let base_path = base_directory.as_ref().to_path_buf();
        if !base_path.exists() {
            fs::create_dir_all(&base_path)?;
        }
        Ok(Self {
            base_directory: base_path,
            roles_lock: Mutex::new(()),
            votes_lock: Mutex::new(()),
            config_lock: Mutex::new(()),
        })
    }

    /// Create a connection over the directory named by `BLINDVOTE_DATA_DIR`,
    /// defaulting to the current working directory, where the original
    /// deployment kept its files.
    pub fn new_default() -> StorageResult<Self> {
        let dir = std::env::var(DATA_DIR_ENV).unwrap_or_else(|_| ".".to_string());
        Self::new(dir)
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    pub fn roles_path(&self) -> PathBuf {
        self.base_directory.join(ROLES_FILE)
    }

    pub fn votes_path(&self) -> PathBuf {
        self.base_directory.join(VOTES_FILE)
    }

    pub fn config_path(&self) -> PathBuf {
        self.base_directory.join(CONFIG_FILE)
    }

    /// Acquire the roles-document critical section.
    pub fn lock_roles(&self) -> MutexGuard<'_, ()> {
        self.roles_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Acquire the votes-document critical section.
    pub fn lock_votes(&self) -> MutexGuard<'_, ()> {
        self.votes_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Acquire the config-document critical section.
    pub fn lock_config(&self) -> MutexGuard<'_, ()> {
        self.config_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Read and parse a whole JSON document, returning `empty` when the file
    /// does not exist. A file that exists but fails to parse is a fatal
    /// configuration error, surfaced to the caller rather than silently
    /// replaced.
    pub fn read_document<T: DeserializeOwned>(&self, path: &Path, empty: T) -> StorageResult<T> {
        if !path.exists() {
            debug!("{} absent, treating as empty store", path.display());
            return Ok(empty);
        }
        let contents = fs::read_to_string(path)?;
        serde_json::from_str(&contents).map_err(|source| StorageError::MalformedDocument {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Atomically overwrite a whole JSON document: serialize, write to a
    /// `.tmp` sibling, then rename over the target so a crash mid-write
    /// never leaves a partial file.
    pub fn write_document<T: Serialize>(&self, path: &Path, doc: &T) -> StorageResult<()> {
        let contents = serde_json::to_string_pretty(doc).map_err(|source| {
            StorageError::MalformedDocument {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, contents)?;
        fs::rename(&temp_path, path)?;
        debug!("wrote {}", path.display());
        Ok(())
    }
}
