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

use crate::database::{DatabaseError, LazyBase64Value, RawIOError, BY_TIME_DB_CF, ENTITIES_DB_CF};
use crate::history::Timestamp;
use serde::{Deserialize, Serialize};

/// The stored state of a single entity.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub fingerprint: String,
    pub master_id: Option<String>,
    pub last_crawled: Timestamp,
}

impl HistoryRecord {
    pub fn new(fingerprint: String, master_id: Option<String>, last_crawled: Timestamp) -> Self {
        Self {
            fingerprint,
            master_id,
            last_crawled,
        }
    }

    pub fn to_bytes(&self, exists_id: &str) -> Result<Vec<u8>, DatabaseError> {
        bincode::serialize(self).enrich_ser(ENTITIES_DB_CF, exists_id, self.clone())
    }

    pub fn from_bytes(exists_id: &str, bytes: &[u8]) -> Result<Self, DatabaseError> {
        bincode::deserialize(bytes).enrich_de(ENTITIES_DB_CF, exists_id, bytes.to_vec())
    }
}

/// The key in the time index: the big endian timestamp followed by the exists id.
/// Sorting the keys sorts by the last crawled time.
pub(crate) fn time_index_key(last_crawled: Timestamp, exists_id: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(8 + exists_id.len());
    key.extend_from_slice(&last_crawled.to_be_bytes());
    key.extend_from_slice(exists_id.as_bytes());
    key
}

/// Splits a time index key into its parts.
pub(crate) fn split_time_index_key(key: &[u8]) -> Result<(Timestamp, String), DatabaseError> {
    if key.len() < 8 {
        return Err(DatabaseError::MalformedKey {
            cf: BY_TIME_DB_CF,
            key: LazyBase64Value(key.to_vec()),
            reason: "shorter than a timestamp",
        });
    }
    let (time, id) = key.split_at(8);
    let mut raw_time = [0u8; 8];
    raw_time.copy_from_slice(time);
    let id = String::from_utf8(id.to_vec()).map_err(|_| DatabaseError::MalformedKey {
        cf: BY_TIME_DB_CF,
        key: LazyBase64Value(key.to_vec()),
        reason: "the exists id is not utf-8",
    })?;
    Ok((Timestamp::from_be_bytes(raw_time), id))
}
