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
    column_family, count_entries, open_db, DBActionType, DatabaseError, RawDatabaseError,
    ALL_HISTORY_CFS, BY_TIME_DB_CF, ENTITIES_DB_CF, META_DB_CF,
};
use crate::history::record::time_index_key;
use crate::history::stale::StaleEntries;
use crate::history::{HistoryError, HistoryRecord, MonotonicClock, Timestamp};
use camino::{Utf8Path, Utf8PathBuf};
use rocksdb::{WriteBatch, DB};
use strum::Display;

const CLOCK_KEY: &'static [u8] = b"clock";

/// The answer of [HistoryStore::exists]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Display)]
pub enum ExistsState {
    /// Never seen.
    Not,
    /// Already seen in the running session.
    Processed,
    /// Seen in a previous session but not yet in the running one.
    Unprocessed,
}

/// The persistent crawl history of a single data source.
///
/// Mixing entities of different sources in one store breaks the removal
/// detection, because a crawl of one source marks everything of the other
/// one as removed.
#[derive(Debug)]
pub struct HistoryStore {
    path: Utf8PathBuf,
    db: Option<DB>,
    clock: MonotonicClock,
    session_start: Option<Timestamp>,
}

impl HistoryStore {
    /// Creates the store without touching the disk, see [HistoryStore::open].
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            db: None,
            clock: MonotonicClock::new(),
            session_start: None,
        }
    }

    /// Creates and opens the store.
    pub fn open_at(path: impl Into<Utf8PathBuf>) -> Result<Self, HistoryError> {
        let mut store = Self::new(path);
        store.open()?;
        Ok(store)
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.db.is_some()
    }

    /// Opens the underlying database. Calling it on an open store does nothing.
    pub fn open(&mut self) -> Result<(), HistoryError> {
        if self.db.is_some() {
            return Ok(());
        }
        log::debug!("Open history at {}", self.path);
        let db = open_db(&self.path)?;
        let cf = column_family(&db, META_DB_CF)?;
        if let Some(found) = db
            .get_cf(cf, CLOCK_KEY)
            .enrich(META_DB_CF, DBActionType::Read, CLOCK_KEY)?
        {
            let raw: [u8; 8] =
                found
                    .as_slice()
                    .try_into()
                    .map_err(|_| DatabaseError::MalformedKey {
                        cf: META_DB_CF,
                        key: crate::database::LazyBase64Value(found.clone()),
                        reason: "the clock is not 8 bytes long",
                    })?;
            self.clock.observe(Timestamp::from_be_bytes(raw));
        }
        // Fail early if a column family went missing.
        column_family(&db, ENTITIES_DB_CF)?;
        column_family(&db, BY_TIME_DB_CF)?;
        self.db = Some(db);
        Ok(())
    }

    /// Flushes and closes the underlying database. Calling it on a closed store does nothing.
    pub fn close(&mut self) -> Result<(), HistoryError> {
        if let Some(db) = self.db.take() {
            log::debug!("Close history at {}", self.path);
            for cf in ALL_HISTORY_CFS {
                db.flush_cf(column_family(&db, cf)?)
                    .enrich_no_key(cf, DBActionType::Flush)?;
            }
        }
        Ok(())
    }

    fn db(&self) -> Result<&DB, HistoryError> {
        self.db
            .as_ref()
            .ok_or_else(|| HistoryError::NotOpen(self.path.clone()))
    }

    /// The start of the running session, if any.
    pub fn session_start(&self) -> Option<Timestamp> {
        self.session_start
    }

    /// Opens the store if necessary and starts a new session.
    pub fn crawl_started(&mut self) -> Result<Timestamp, HistoryError> {
        self.open()?;
        let start = self.clock.next();
        let db = self.db()?;
        db.put_cf(
            column_family(db, META_DB_CF)?,
            CLOCK_KEY,
            start.to_be_bytes(),
        )
        .enrich(META_DB_CF, DBActionType::Write, CLOCK_KEY)?;
        log::debug!("Crawl session started at {start} for {}", self.path);
        self.session_start = Some(start);
        Ok(start)
    }

    /// Returns every entity that was not seen since [HistoryStore::crawl_started].
    ///
    /// The sequence is lazy and consuming: an exists id is deleted from the store the
    /// moment it is yielded. Dropping the sequence early keeps the remaining stale
    /// entities for the next sweep.
    pub fn crawl_finished(&mut self) -> Result<StaleEntries<'_>, HistoryError> {
        let start = self
            .session_start
            .ok_or_else(|| HistoryError::NoSession(self.path.clone()))?;
        let db = self.db()?;
        Ok(StaleEntries::new(db, start)?)
    }

    fn read_record(&self, db: &DB, exists_id: &str) -> Result<Option<HistoryRecord>, HistoryError> {
        let found = db
            .get_pinned_cf(column_family(db, ENTITIES_DB_CF)?, exists_id)
            .enrich(ENTITIES_DB_CF, DBActionType::Read, exists_id)?;
        match found {
            None => Ok(None),
            Some(found) => Ok(Some(HistoryRecord::from_bytes(exists_id, &found)?)),
        }
    }

    /// Writes `record` and moves its time index entry away from `previous`.
    fn write_record(
        &self,
        db: &DB,
        exists_id: &str,
        previous: Option<&HistoryRecord>,
        record: &HistoryRecord,
    ) -> Result<(), HistoryError> {
        let entities = column_family(db, ENTITIES_DB_CF)?;
        let by_time = column_family(db, BY_TIME_DB_CF)?;
        let meta = column_family(db, META_DB_CF)?;

        let mut batch = WriteBatch::default();
        if let Some(previous) = previous {
            batch.delete_cf(by_time, time_index_key(previous.last_crawled, exists_id));
        }
        batch.put_cf(entities, exists_id, record.to_bytes(exists_id)?);
        batch.put_cf(by_time, time_index_key(record.last_crawled, exists_id), b"");
        batch.put_cf(meta, CLOCK_KEY, record.last_crawled.to_be_bytes());
        db.write(batch)
            .enrich(ENTITIES_DB_CF, DBActionType::BulkWrite, exists_id)?;
        Ok(())
    }

    /// Inserts a new entity, seen now.
    ///
    /// Callers check [HistoryStore::exists] first. An already known entity is
    /// simply replaced.
    pub fn add_entity(
        &self,
        exists_id: &str,
        fingerprint: &str,
        master_id: Option<&str>,
    ) -> Result<(), HistoryError> {
        let db = self.db()?;
        let previous = self.read_record(db, exists_id)?;
        if previous.is_some() {
            log::debug!("{exists_id} was added although it is already known.");
        }
        let record = HistoryRecord::new(
            fingerprint.to_string(),
            master_id.map(str::to_string),
            self.clock.next(),
        );
        self.write_record(db, exists_id, previous.as_ref(), &record)
    }

    /// Inserts or replaces an entity, seen now.
    pub fn update_entity(
        &self,
        exists_id: &str,
        fingerprint: &str,
        master_id: Option<&str>,
    ) -> Result<(), HistoryError> {
        let db = self.db()?;
        let previous = self.read_record(db, exists_id)?;
        let record = HistoryRecord::new(
            fingerprint.to_string(),
            master_id.map(str::to_string),
            self.clock.next(),
        );
        self.write_record(db, exists_id, previous.as_ref(), &record)
    }

    /// Marks a known entity as seen now, without touching its fingerprint.
    pub fn update_last_crawled_time(&self, exists_id: &str) -> Result<(), HistoryError> {
        let db = self.db()?;
        let previous = self
            .read_record(db, exists_id)?
            .ok_or_else(|| HistoryError::EntityNotFound(exists_id.to_string()))?;
        let mut record = previous.clone();
        record.last_crawled = self.clock.next();
        self.write_record(db, exists_id, Some(&previous), &record)
    }

    /// Deletes an entity. Returns true if it was known.
    pub fn remove_entity(&self, exists_id: &str) -> Result<bool, HistoryError> {
        let db = self.db()?;
        let Some(previous) = self.read_record(db, exists_id)? else {
            return Ok(false);
        };
        let mut batch = WriteBatch::default();
        batch.delete_cf(column_family(db, ENTITIES_DB_CF)?, exists_id);
        batch.delete_cf(
            column_family(db, BY_TIME_DB_CF)?,
            time_index_key(previous.last_crawled, exists_id),
        );
        db.write(batch)
            .enrich(ENTITIES_DB_CF, DBActionType::Delete, exists_id)?;
        Ok(true)
    }

    /// Checks if and when the entity was seen.
    ///
    /// Without a running session every known entity counts as unprocessed.
    pub fn exists(&self, exists_id: &str) -> Result<ExistsState, HistoryError> {
        let db = self.db()?;
        Ok(match self.read_record(db, exists_id)? {
            None => ExistsState::Not,
            Some(record) => match self.session_start {
                Some(start) if record.last_crawled >= start => ExistsState::Processed,
                _ => ExistsState::Unprocessed,
            },
        })
    }

    /// True iff the entity is stored with exactly this fingerprint.
    pub fn exists_with_fingerprint(
        &self,
        exists_id: &str,
        fingerprint: &str,
    ) -> Result<bool, HistoryError> {
        Ok(self
            .get(exists_id)?
            .is_some_and(|record| record.fingerprint == fingerprint))
    }

    pub fn get(&self, exists_id: &str) -> Result<Option<HistoryRecord>, HistoryError> {
        let db = self.db()?;
        self.read_record(db, exists_id)
    }

    pub fn get_fingerprint(&self, exists_id: &str) -> Result<Option<String>, HistoryError> {
        Ok(self.get(exists_id)?.map(|record| record.fingerprint))
    }

    pub fn get_last_crawled_time(&self, exists_id: &str) -> Result<Option<Timestamp>, HistoryError> {
        Ok(self.get(exists_id)?.map(|record| record.last_crawled))
    }

    /// The number of known entities.
    pub fn len(&self) -> Result<usize, HistoryError> {
        Ok(count_entries(self.db()?, ENTITIES_DB_CF)?)
    }

    pub fn is_empty(&self) -> Result<bool, HistoryError> {
        Ok(self.len()? == 0)
    }
}

impl Drop for HistoryStore {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            log::error!("Failed to close the history at {}: {err}", self.path);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use itertools::Itertools;

    fn temp_store() -> (tempfile::TempDir, HistoryStore) {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("history")).unwrap();
        let store = HistoryStore::open_at(path).unwrap();
        (dir, store)
    }

    #[test]
    fn unknown_entities_do_not_exist() {
        let (_dir, mut store) = temp_store();
        store.crawl_started().unwrap();
        assert_eq!(ExistsState::Not, store.exists("/a").unwrap());
        assert_eq!(None, store.get_fingerprint("/a").unwrap());
        assert!(!store.exists_with_fingerprint("/a", "1").unwrap());
    }

    #[test]
    fn entities_seen_in_this_session_are_processed() {
        let (_dir, mut store) = temp_store();
        store.crawl_started().unwrap();
        store.add_entity("/a", "1", None).unwrap();
        assert_eq!(ExistsState::Processed, store.exists("/a").unwrap());

        store.crawl_started().unwrap();
        assert_eq!(ExistsState::Unprocessed, store.exists("/a").unwrap());
        assert!(store.exists_with_fingerprint("/a", "1").unwrap());
        assert!(!store.exists_with_fingerprint("/a", "2").unwrap());
    }

    #[test]
    fn unmodified_entities_keep_their_fingerprint() {
        let (_dir, mut store) = temp_store();
        store.crawl_started().unwrap();
        store.add_entity("/a", "1", Some("/")).unwrap();
        let first = store.get_last_crawled_time("/a").unwrap().unwrap();

        store.crawl_started().unwrap();
        store.update_last_crawled_time("/a").unwrap();
        let record = store.get("/a").unwrap().unwrap();
        assert!(record.last_crawled > first);
        assert_eq!("1", record.fingerprint);
        assert_eq!(Some("/".to_string()), record.master_id);
    }

    #[test]
    fn updating_the_time_of_unknown_entities_fails() {
        let (_dir, mut store) = temp_store();
        store.crawl_started().unwrap();
        let err = store.update_last_crawled_time("/missing").unwrap_err();
        assert!(matches!(err, HistoryError::EntityNotFound(id) if id == "/missing"));
    }

    #[test]
    fn update_replaces_the_fingerprint() {
        let (_dir, mut store) = temp_store();
        store.crawl_started().unwrap();
        store.add_entity("/a", "1", None).unwrap();
        store.update_entity("/a", "2", None).unwrap();
        assert_eq!(Some("2".to_string()), store.get_fingerprint("/a").unwrap());
        assert_eq!(1, store.len().unwrap());
    }

    #[test]
    fn stale_entities_are_swept_exactly_once() {
        let (_dir, mut store) = temp_store();
        store.crawl_started().unwrap();
        store.add_entity("/a", "1", None).unwrap();
        store.add_entity("/b", "1", None).unwrap();

        store.crawl_started().unwrap();
        store.update_last_crawled_time("/a").unwrap();
        store.add_entity("/c", "1", None).unwrap();

        let removed: Vec<String> = store.crawl_finished().unwrap().try_collect().unwrap();
        assert_eq!(vec!["/b".to_string()], removed);
        assert_eq!(ExistsState::Not, store.exists("/b").unwrap());
        assert_eq!(2, store.len().unwrap());

        assert_eq!(0, store.crawl_finished().unwrap().count());
    }

    #[test]
    fn partially_consumed_sweeps_keep_the_rest() {
        let (_dir, mut store) = temp_store();
        store.crawl_started().unwrap();
        for id in ["/a", "/b", "/c"] {
            store.add_entity(id, "1", None).unwrap();
        }
        store.crawl_started().unwrap();

        let first = store.crawl_finished().unwrap().next().unwrap().unwrap();
        assert_eq!("/a", first);
        assert_eq!(2, store.len().unwrap());

        let rest: Vec<String> = store.crawl_finished().unwrap().try_collect().unwrap();
        assert_eq!(vec!["/b".to_string(), "/c".to_string()], rest);
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn sweeping_without_session_fails() {
        let (_dir, mut store) = temp_store();
        assert!(matches!(
            store.crawl_finished().err(),
            Some(HistoryError::NoSession(_))
        ));
    }

    #[test]
    fn history_survives_reopening() {
        let (_dir, mut store) = temp_store();
        store.crawl_started().unwrap();
        store.add_entity("/a", "1", None).unwrap();
        let seen = store.get_last_crawled_time("/a").unwrap().unwrap();
        store.close().unwrap();
        assert!(!store.is_open());
        assert!(matches!(store.get("/a"), Err(HistoryError::NotOpen(_))));

        let mut reopened = HistoryStore::open_at(store.path().to_path_buf()).unwrap();
        let start = reopened.crawl_started().unwrap();
        assert!(start > seen);
        assert_eq!(ExistsState::Unprocessed, reopened.exists("/a").unwrap());
        assert_eq!(Some("1".to_string()), reopened.get_fingerprint("/a").unwrap());
    }

    #[test]
    fn open_and_close_are_idempotent() {
        let (_dir, mut store) = temp_store();
        store.open().unwrap();
        store.open().unwrap();
        store.close().unwrap();
        store.close().unwrap();
        store.open().unwrap();
        assert!(store.is_open());
    }

    #[test]
    fn removed_entities_leave_no_index_behind() {
        let (_dir, mut store) = temp_store();
        store.crawl_started().unwrap();
        store.add_entity("/a", "1", None).unwrap();
        assert!(store.remove_entity("/a").unwrap());
        assert!(!store.remove_entity("/a").unwrap());
        store.crawl_started().unwrap();
        assert_eq!(0, store.crawl_finished().unwrap().count());
    }
}
