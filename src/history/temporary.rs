// Copyright 2024. Felix Engl
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::database::destroy_db;
use crate::history::{HistoryError, HistoryStore};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs::{File, OpenOptions};
use std::io::Write;

const LOCK_EXTENSION: &'static str = "lock";

/// A directory shared by all crawls that need a session scoped history.
///
/// Every temporary history lives in its own sub directory and is guarded by a
/// sibling lock file. A directory without lock file belongs to nobody and is
/// removed by the next crawl that cleans up.
#[derive(Debug, Clone)]
pub struct TemporaryArea {
    root: Utf8PathBuf,
}

impl TemporaryArea {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<system temp>/linyphia`
    pub fn system_default() -> Result<Self, HistoryError> {
        let root = std::env::temp_dir().join("linyphia");
        Ok(Self::new(
            Utf8PathBuf::from_path_buf(root).map_err(HistoryError::NotUtf8)?,
        ))
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn io_error(&self, source: std::io::Error) -> HistoryError {
        HistoryError::TemporaryArea {
            path: self.root.clone(),
            source,
        }
    }

    /// Creates a fresh, locked temporary history.
    pub fn acquire(&self) -> Result<TemporaryHistory, HistoryError> {
        std::fs::create_dir_all(&self.root).map_err(|err| self.io_error(err))?;
        let name = uuid::Uuid::new_v4().to_string();
        let lock_path = self.root.join(format!("{name}.{LOCK_EXTENSION}"));
        let mut lock = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
            .map_err(|err| self.io_error(err))?;
        write!(lock, "{}", std::process::id()).map_err(|err| self.io_error(err))?;
        let store_path = self.root.join(&name);
        log::debug!("Acquired temporary history {store_path}");
        Ok(TemporaryHistory {
            area: self.clone(),
            store_path,
            lock_path,
            _lock: lock,
            released: false,
        })
    }

    /// Removes every history directory that is not guarded by a lock file.
    pub fn sweep_orphans(&self) -> Result<usize, HistoryError> {
        if !self.root.exists() {
            return Ok(0);
        }
        let mut removed = 0usize;
        for entry in self.root.read_dir_utf8().map_err(|err| self.io_error(err))? {
            let entry = entry.map_err(|err| self.io_error(err))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let lock = path.with_extension(LOCK_EXTENSION);
            if lock.exists() {
                continue;
            }
            log::info!("Remove orphaned temporary history {path}");
            std::fs::remove_dir_all(path).map_err(|err| self.io_error(err))?;
            removed += 1;
        }
        Ok(removed)
    }
}

/// A session scoped history inside a [TemporaryArea].
#[derive(Debug)]
pub struct TemporaryHistory {
    area: TemporaryArea,
    store_path: Utf8PathBuf,
    lock_path: Utf8PathBuf,
    _lock: File,
    released: bool,
}

impl TemporaryHistory {
    pub fn store_path(&self) -> &Utf8Path {
        &self.store_path
    }

    /// Creates the store backed by this temporary history.
    pub fn create_store(&self) -> HistoryStore {
        HistoryStore::new(self.store_path.clone())
    }

    /// Deletes the history and its lock, then cleans up orphans of crashed crawls.
    /// The store must be closed before.
    pub fn release(mut self) -> Result<(), HistoryError> {
        self.release_internal()
    }

    fn release_internal(&mut self) -> Result<(), HistoryError> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        destroy_db(&self.store_path)?;
        if self.store_path.exists() {
            std::fs::remove_dir_all(&self.store_path).map_err(|err| self.area.io_error(err))?;
        }
        std::fs::remove_file(&self.lock_path).map_err(|err| self.area.io_error(err))?;
        log::debug!("Released temporary history {}", self.store_path);
        self.area.sweep_orphans()?;
        Ok(())
    }
}

impl Drop for TemporaryHistory {
    fn drop(&mut self) {
        if let Err(err) = self.release_internal() {
            log::warn!("Failed to release the temporary history {}: {err}", self.store_path);
        }
    }
}
