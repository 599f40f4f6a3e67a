//! Exclusive access to a JSON data file shared between processes.
//!
//! The occupancy check in [`InMemoryStore`] only covers one process. A
//! [`DataFile`] extends it across processes: hold one for the whole
//! load, change, save sequence and no other holder can interleave.

use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::debug;

use crate::error::{Result, SchedulingError};
use crate::memory::InMemoryStore;

/// Lock guard for a data file. The lock is released when dropped.
#[derive(Debug)]
pub struct DataFile {
    path: PathBuf,
    _lock: File,
}

impl DataFile {
    /// Block until no other holder has `path`, then take it.
    ///
    /// The lock lives on a sidecar `<file>.lock`, since the data file itself
    /// is replaced on every save.
    pub fn lock(path: &Path) -> Result<Self> {
        let lock_path = lock_path(path);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| {
                SchedulingError::Store(format!(
                    "failed to open lock file {}: {}",
                    lock_path.display(),
                    e
                ))
            })?;

        file.lock_exclusive().map_err(|e| {
            SchedulingError::Store(format!("failed to lock {}: {}", lock_path.display(), e))
        })?;
        debug!(path = %path.display(), "locked data file");

        Ok(Self {
            path: path.to_path_buf(),
            _lock: file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the current contents. A missing file is an empty store.
    pub fn load(&self) -> Result<InMemoryStore> {
        InMemoryStore::load(&self.path)
    }

    pub fn save(&self, store: &InMemoryStore) -> Result<()> {
        store.save(&self.path)
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_else(|| OsString::from("data"));
    name.push(".lock");
    path.with_file_name(name)
}
