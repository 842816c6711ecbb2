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

use crate::provider::Locator;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// The general crawling settings.
#[derive(Debug, Clone, Deserialize, Serialize, Eq, PartialEq)]
#[serde(rename(serialize = "Crawl"))]
#[serde(default)]
pub struct CrawlConfig {
    /// The maximum depth below the start locator. None means unlimited. (default: None)
    pub max_depth: Option<usize>,
    /// Classify entities seen twice in a crawl as processed. Without a history a
    /// temporary one is created for the crawl. (default: true)
    pub cycle_detection: bool,
    /// Report the entities not seen in a crawl as removed. (default: true)
    pub check_removals: bool,
    /// Abort the crawl on the first failing entity. (default: false)
    pub interrupt_on_error: bool,
    /// Log every classification on the info level. (default: false)
    pub verbose: bool,
    /// The directory of the persistent histories, one per start locator. None means
    /// that every entity is new. (default: None)
    pub history_path: Option<Utf8PathBuf>,
    /// Where temporary histories are created. (default: <system temp>/linyphia)
    pub temp_area: Option<Utf8PathBuf>,
    /// Only locators matching one of these patterns are followed. Empty allows everything.
    pub include: Vec<String>,
    /// Locators matching one of these patterns are never followed.
    pub exclude: Vec<String>,
    /// Only this many bytes of an entity are handed to the extraction. (in byte)
    pub max_content_size: Option<u64>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            cycle_detection: true,
            check_removals: true,
            interrupt_on_error: false,
            verbose: false,
            history_path: None,
            temp_area: None,
            include: Vec::new(),
            exclude: Vec::new(),
            max_content_size: None,
        }
    }
}

impl CrawlConfig {
    /// The history of the crawls starting at `locator`, if histories are kept.
    pub fn history_for(&self, locator: &Locator) -> Option<Utf8PathBuf> {
        self.history_path
            .as_deref()
            .map(|root| history_below(root, locator))
    }
}

/// The history of `locator` below the history directory `root`.
pub fn history_below(root: &Utf8Path, locator: &Locator) -> Utf8PathBuf {
    let id = uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_URL, locator.as_str().as_bytes());
    root.join(id.to_string())
}
