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

use crate::database::DatabaseError;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors of the [HistoryStore](crate::history::HistoryStore).
///
/// All of them are integrity errors, continuing a crawl after one of them
/// would corrupt the following incremental runs.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error(transparent)]
    Database(#[from] DatabaseError),
    #[error("The history at {0} is not open.")]
    NotOpen(Utf8PathBuf),
    #[error("The entity {0} is not part of the history.")]
    EntityNotFound(String),
    #[error("No crawl session was started for the history at {0}.")]
    NoSession(Utf8PathBuf),
    #[error("The temporary history area {path} is not usable: {source}")]
    TemporaryArea {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("The path {0:?} is not valid utf-8.")]
    NotUtf8(std::path::PathBuf),
}
