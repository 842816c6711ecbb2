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

use crate::database::{
    column_family, count_entries, open_db_as_secondary, DBActionType, RawDatabaseError,
    BY_TIME_DB_CF, ENTITIES_DB_CF,
};
use crate::history::{HistoryError, HistoryRecord, Timestamp};
use camino::{Utf8Path, Utf8PathBuf};
use rocksdb::{ReadOptions, DB};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A read only view on a history that is written by someone else, e.g. for a
/// status query while a crawl is running.
///
/// The view follows the writer as rocksdb secondary instance and catches up at
/// most every `refresh_interval`, so it only sees an eventually consistent
/// snapshot.
#[derive(Debug)]
pub struct HistoryReader {
    primary: Utf8PathBuf,
    secondary: Utf8PathBuf,
    db: Option<DB>,
    refresh_interval: Duration,
    last_refresh: Mutex<Instant>,
}

impl HistoryReader {
    pub fn open(
        primary: impl AsRef<Utf8Path>,
        refresh_interval: Duration,
    ) -> Result<Self, HistoryError> {
        let primary = primary.as_ref().to_path_buf();
        let temp = std::env::temp_dir().join(format!("linyphia-reader-{}", uuid::Uuid::new_v4()));
        let secondary = Utf8PathBuf::from_path_buf(temp).map_err(HistoryError::NotUtf8)?;
        let db = open_db_as_secondary(&primary, &secondary)?;
        db.try_catch_up_with_primary()
            .enrich_no_key("*", DBActionType::CatchUp)?;
        Ok(Self {
            primary,
            secondary,
            db: Some(db),
            refresh_interval,
            last_refresh: Mutex::new(Instant::now()),
        })
    }

    pub fn primary(&self) -> &Utf8Path {
        &self.primary
    }

    fn db(&self) -> Result<&DB, HistoryError> {
        self.db
            .as_ref()
            .ok_or_else(|| HistoryError::NotOpen(self.primary.clone()))
    }

    /// Catches up with the writer right now.
    pub fn refresh(&self) -> Result<(), HistoryError> {
        self.db()?
            .try_catch_up_with_primary()
            .enrich_no_key("*", DBActionType::CatchUp)?;
        if let Ok(mut last) = self.last_refresh.lock() {
            *last = Instant::now();
        }
        Ok(())
    }

    fn refresh_if_outdated(&self) -> Result<(), HistoryError> {
        let outdated = match self.last_refresh.lock() {
            Ok(last) => last.elapsed() >= self.refresh_interval,
            Err(_) => true,
        };
        if outdated {
            log::trace!("Refresh the view on {}", self.primary);
            self.refresh()?;
        }
        Ok(())
    }

    pub fn get(&self, exists_id: &str) -> Result<Option<HistoryRecord>, HistoryError> {
        self.refresh_if_outdated()?;
        let db = self.db()?;
        let found = db
            .get_pinned_cf(column_family(db, ENTITIES_DB_CF)?, exists_id)
            .enrich(ENTITIES_DB_CF, DBActionType::Read, exists_id)?;
        match found {
            None => Ok(None),
            Some(found) => Ok(Some(HistoryRecord::from_bytes(exists_id, &found)?)),
        }
    }

    pub fn len(&self) -> Result<usize, HistoryError> {
        self.refresh_if_outdated()?;
        Ok(count_entries(self.db()?, ENTITIES_DB_CF)?)
    }

    pub fn is_empty(&self) -> Result<bool, HistoryError> {
        Ok(self.len()? == 0)
    }

    /// Counts the entities not seen since `since`.
    pub fn stale_count(&self, since: Timestamp) -> Result<usize, HistoryError> {
        self.refresh_if_outdated()?;
        let mut options = ReadOptions::default();
        options.fill_cache(false);
        options.set_iterate_upper_bound(since.to_be_bytes().to_vec());
        let db = self.db()?;
        let mut iter = db.raw_iterator_cf_opt(column_family(db, BY_TIME_DB_CF)?, options);
        iter.seek_to_first();
        let mut ct = 0usize;
        while iter.valid() {
            ct += 1;
            iter.next();
        }
        iter.status()
            .enrich_no_key(BY_TIME_DB_CF, DBActionType::Iterate)?;
        Ok(ct)
    }
}

impl Drop for HistoryReader {
    fn drop(&mut self) {
        // The secondary directory only holds the info log of this view.
        drop(self.db.take());
        if let Err(err) = std::fs::remove_dir_all(&self.secondary) {
            log::debug!("Failed to remove {}: {err}", self.secondary);
        }
    }
}
