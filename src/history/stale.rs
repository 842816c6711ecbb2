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
    column_family, DBActionType, RawDatabaseError, BY_TIME_DB_CF, ENTITIES_DB_CF,
};
use crate::history::record::split_time_index_key;
use crate::history::{HistoryError, HistoryRecord, Timestamp};
use rocksdb::{ColumnFamily, DBRawIteratorWithThreadMode, ReadOptions, WriteBatch, DB};

/// The lazy, consuming sweep over all entities not seen since the session start.
///
/// Iterates the time index in `[0, session_start)`. The iterator works on an
/// implicit snapshot, so deleting the yielded entries does not disturb it.
pub struct StaleEntries<'a> {
    db: &'a DB,
    entities: &'a ColumnFamily,
    by_time: &'a ColumnFamily,
    iter: DBRawIteratorWithThreadMode<'a, DB>,
    finished: bool,
}

impl<'a> StaleEntries<'a> {
    pub(crate) fn new(db: &'a DB, session_start: Timestamp) -> Result<Self, HistoryError> {
        let entities = column_family(db, ENTITIES_DB_CF)?;
        let by_time = column_family(db, BY_TIME_DB_CF)?;
        let mut options = ReadOptions::default();
        options.fill_cache(false);
        options.set_iterate_upper_bound(session_start.to_be_bytes().to_vec());
        let mut iter = db.raw_iterator_cf_opt(by_time, options);
        iter.seek_to_first();
        Ok(Self {
            db,
            entities,
            by_time,
            iter,
            finished: false,
        })
    }

    /// Deletes the entity behind `index_key` if the index entry is still the current one.
    /// Returns the exists id if something was removed.
    fn sweep(&self, index_key: &[u8]) -> Result<Option<String>, HistoryError> {
        let (last_crawled, exists_id) = split_time_index_key(index_key)?;
        let current = self
            .db
            .get_pinned_cf(self.entities, &exists_id)
            .enrich(ENTITIES_DB_CF, DBActionType::Read, &exists_id)?
            .map(|found| HistoryRecord::from_bytes(&exists_id, &found))
            .transpose()?;

        let mut batch = WriteBatch::default();
        batch.delete_cf(self.by_time, index_key);
        let removed = match current {
            Some(record) if record.last_crawled == last_crawled => {
                batch.delete_cf(self.entities, &exists_id);
                Some(exists_id)
            }
            _ => {
                log::warn!("Dropping a dangling time index entry for {exists_id}.");
                None
            }
        };
        self.db
            .write(batch)
            .enrich(BY_TIME_DB_CF, DBActionType::Delete, index_key)?;
        Ok(removed)
    }
}

impl<'a> Iterator for StaleEntries<'a> {
    type Item = Result<String, HistoryError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            if !self.iter.valid() {
                self.finished = true;
                return match self.iter.status() {
                    Ok(()) => None,
                    Err(err) => Some(Err(err
                        .enrich_no_key(BY_TIME_DB_CF, DBActionType::Iterate)
                        .into())),
                };
            }
            let Some(key) = self.iter.key().map(<[u8]>::to_vec) else {
                self.iter.next();
                continue;
            };
            self.iter.next();
            match self.sweep(&key) {
                Ok(Some(exists_id)) => return Some(Ok(exists_id)),
                Ok(None) => continue,
                Err(err) => {
                    self.finished = true;
                    return Some(Err(err));
                }
            }
        }
        None
    }
}
