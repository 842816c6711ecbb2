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

mod database_error;
mod options;

pub use database_error::*;
pub use options::*;

use camino::Utf8Path;
use rocksdb::{ColumnFamily, ReadOptions, DB};

/// Returns the handle of a column family or fails with [DatabaseError::MissingColumnFamily].
pub fn column_family<'a>(db: &'a DB, name: &'static str) -> Result<&'a ColumnFamily, DatabaseError> {
    db.cf_handle(name)
        .ok_or(DatabaseError::MissingColumnFamily { cf: name })
}

/// Opens the history database in a standardized way.
pub fn open_db<P: AsRef<Utf8Path>>(path: P) -> Result<DB, DatabaseError> {
    let path = path.as_ref();
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    let (db_options, cf_options) = create_open_options();
    DB::open_cf_with_opts(&db_options, path.as_std_path(), cf_options)
        .map_err(|source| DatabaseError::Damaged { cf: "*", source })
}

/// Opens a secondary instance following the primary at `primary`.
/// The secondary keeps its own info log in `secondary`.
pub fn open_db_as_secondary<P: AsRef<Utf8Path>>(
    primary: P,
    secondary: P,
) -> Result<DB, DatabaseError> {
    let secondary = secondary.as_ref();
    if !secondary.exists() {
        std::fs::create_dir_all(secondary)?;
    }
    let mut options = db_options();
    options.set_max_open_files(-1);
    DB::open_cf_as_secondary(
        &options,
        primary.as_ref().as_std_path(),
        secondary.as_std_path(),
        ALL_HISTORY_CFS,
    )
    .map_err(|source| DatabaseError::Damaged { cf: "*", source })
}

/// Deletes a db
pub fn destroy_db<P: AsRef<Utf8Path>>(path: P) -> Result<(), DatabaseError> {
    let path = path.as_ref();
    if path.exists() {
        DB::destroy(&db_options(), path.as_std_path())
            .map_err(|source| DatabaseError::Damaged { cf: "*", source })
    } else {
        Ok(())
    }
}

/// Counts the entries of a column family by scanning it.
pub fn count_entries(db: &DB, cf: &'static str) -> Result<usize, DatabaseError> {
    let handle = column_family(db, cf)?;
    let mut options = ReadOptions::default();
    options.fill_cache(false);
    let mut iter = db.raw_iterator_cf_opt(handle, options);
    iter.seek_to_first();
    let mut ct: usize = 0;
    while iter.valid() {
        ct += 1;
        iter.next();
    }
    iter.status().enrich_no_key(cf, DBActionType::Iterate)?;
    Ok(ct)
}
