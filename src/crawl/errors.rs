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

use crate::config::ConfigError;
use crate::extraction::ExtractionError;
use crate::history::HistoryError;
use crate::provider::ProviderError;
use crate::sink::SinkError;
use thiserror::Error;

/// The failure of a single entity. The crawl continues unless it is interrupted on errors.
#[derive(Debug, Error)]
pub enum EntityError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

impl EntityError {
    /// Errors that must abort the whole crawl.
    pub fn is_fatal(&self) -> bool {
        match self {
            EntityError::Provider(err) => err.is_fatal(),
            EntityError::Extraction(_) => false,
        }
    }
}

/// Errors that end a crawl. They carry the last known locator.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("The history failed at {locator}: {source}")]
    History {
        locator: String,
        #[source]
        source: HistoryError,
    },
    #[error("The sink failed at {locator}: {source}")]
    Sink {
        locator: String,
        #[source]
        source: SinkError,
    },
    #[error("The crawl was interrupted at {locator}: {source}")]
    Interrupted {
        locator: String,
        #[source]
        source: EntityError,
    },
}

impl CrawlError {
    pub(crate) fn entity(locator: impl ToString, err: EntityError) -> Self {
        let locator = locator.to_string();
        match err {
            EntityError::Provider(ProviderError::History(source)) => {
                CrawlError::History { locator, source }
            }
            source => CrawlError::Interrupted { locator, source },
        }
    }
}
