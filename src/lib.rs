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

//! Linyphia crawls file trees, maildirs and websites incrementally.
//!
//! Every visited entity is classified against a persistent crawl history as
//! new, modified, unmodified, already processed (cycle) or removed. Only new and
//! modified entities are handed to the content extraction.

pub mod app;
pub mod config;
pub mod crawl;
pub mod database;
pub mod extraction;
pub mod format;
pub mod history;
pub mod metadata;
pub mod provider;
pub mod runtime;
pub mod sink;

#[cfg(test)]
pub(crate) mod test_impls;

pub use crawl::{CrawlContext, CrawlReport, Crawler, CrawlerBuilder};
pub use history::HistoryStore;
pub use metadata::{Metadata, ModificationState};
pub use provider::{Locator, StreamProviderRegistry};
