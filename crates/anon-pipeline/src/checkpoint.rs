//! Durable set of completed chunk indices
//!
//! The checkpoint file is a JSON array of ascending chunk indices. Each commit
//! rewrites the whole array to a staging file, fsyncs it and renames it over
//! the previous file. A crash therefore loses at most the latest commit, which
//! only causes that chunk to be processed again.
//!
//! The store is not shared. The dispatcher loop owns it and serializes every
//! commit through `&mut self`.

use anon_common::{AnonError, Result};
use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Default checkpoint file name inside the output directory
pub const DEFAULT_CHECKPOINT_FILE: &str = "checkpoint.json";

#[derive(Debug)]
pub struct CheckpointStore {
    path: PathBuf,
    completed: BTreeSet<u64>,
}

impl CheckpointStore {
    /// Load the store from `path`
    ///
    /// A missing file means nothing has been completed yet. A file that exists
    /// but does not parse (empty files included) is reported as
    /// [`AnonError::CheckpointCorrupt`] instead of being treated as empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let completed = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice::<BTreeSet<u64>>(&bytes).map_err(|e| {
                AnonError::CheckpointCorrupt {
                    path: path.clone(),
                    reason: e.to_string(),
                }
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "No checkpoint file, starting fresh");
                BTreeSet::new()
            },
            Err(e) => return Err(e.into()),
        };

        if !completed.is_empty() {
            info!(
                path = %path.display(),
                completed = completed.len(),
                "Resuming from checkpoint"
            );
        }

        Ok(Self { path, completed })
    }

    pub fn completed(&self) -> &BTreeSet<u64> {
        &self.completed
    }

    pub fn contains(&self, index: u64) -> bool {
        self.completed.contains(&index)
    }

    pub fn len(&self) -> usize {
        self.completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.completed.is_empty()
    }

    /// Durably record `index` as complete
    ///
    /// Committing an index twice is harmless. The in-memory set only changes
    /// once the file has been replaced.
    pub fn commit(&mut self, index: u64) -> Result<()> {
        let inserted = self.completed.insert(index);
        if let Err(e) = self.persist() {
            if inserted {
                self.completed.remove(&index);
            }
            return Err(e);
        }
        Ok(())
    }

    /// Forget `index` so the next run processes it again
    pub fn remove(&mut self, index: u64) -> Result<bool> {
        if !self.completed.remove(&index) {
            return Ok(false);
        }
        if let Err(e) = self.persist() {
            self.completed.insert(index);
            return Err(e);
        }
        Ok(true)
    }

    fn persist(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;

        let mut staged = NamedTempFile::new_in(dir)?;
        serde_json::to_writer(&mut staged, &self.completed)?;
        staged.as_file().sync_all()?;
        staged.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}
