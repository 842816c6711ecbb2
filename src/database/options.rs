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

use rocksdb::{BlockBasedOptions, Options};

/// existsId -> record
pub const ENTITIES_DB_CF: &'static str = "entities";
/// last crawled (be) ++ existsId -> ()
pub const BY_TIME_DB_CF: &'static str = "by_time";
/// Bookkeeping like the persisted clock.
pub const META_DB_CF: &'static str = "meta";

pub const ALL_HISTORY_CFS: [&'static str; 3] = [ENTITIES_DB_CF, BY_TIME_DB_CF, META_DB_CF];

/// Creates the open option
pub(crate) fn create_open_options() -> (Options, [(&'static str, Options); 3]) {
    let db_options = db_options();
    let cf_options = [
        (ENTITIES_DB_CF, entities_cf_options()),
        (BY_TIME_DB_CF, by_time_cf_options()),
        (META_DB_CF, meta_cf_options()),
    ];
    (db_options, cf_options)
}

pub(crate) fn db_options() -> Options {
    let mut options = Options::default();
    options.create_if_missing(true);
    options.create_missing_column_families(true);
    options
}

pub fn entities_cf_options() -> Options {
    let mut options = Options::default();
    options.create_if_missing(true);
    options.create_missing_column_families(true);

    // Most lookups are point lookups for a single exists id.
    // https://github.com/facebook/rocksdb/wiki/RocksDB-Bloom-Filter
    let mut bb_options = BlockBasedOptions::default();
    bb_options.set_bloom_filter(10.0, true);
    bb_options.set_whole_key_filtering(true);
    options.set_block_based_table_factory(&bb_options);
    options
}

pub fn by_time_cf_options() -> Options {
    let mut options = Options::default();
    options.create_if_missing(true);
    options.create_missing_column_families(true);
    options
}

pub fn meta_cf_options() -> Options {
    let mut options = Options::default();
    options.create_if_missing(true);
    options.create_missing_column_families(true);
    options
}
