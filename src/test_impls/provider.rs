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

use crate::crawl::CrawlContext;
use crate::metadata::{ContainerKind, Metadata};
use crate::provider::{LazyStream, Locator, ProviderError, StreamProvider};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone)]
struct StaticEntry {
    exists_id: Option<String>,
    fingerprint: String,
    content: Vec<u8>,
    container: Option<ContainerKind>,
    children: Vec<Locator>,
}

/// An in memory source for the `mem` scheme, e.g. `mem:///a/b`.
///
/// Entities are identified by the path of their locator unless an explicit
/// exists id is set. Unknown paths fail like missing files.
#[derive(Debug, Default)]
pub struct StaticProvider {
    entries: Mutex<HashMap<String, StaticEntry>>,
    opened: Mutex<Vec<String>>,
}

pub fn mem(path: &str) -> Locator {
    Locator::parse(&format!("mem://{path}")).unwrap()
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, path: &str, entry: StaticEntry) {
        self.entries.lock().unwrap().insert(path.to_string(), entry);
    }

    /// A leaf with text content.
    pub fn file(&self, path: &str, fingerprint: &str, content: &str) {
        self.insert(
            path,
            StaticEntry {
                exists_id: None,
                fingerprint: fingerprint.to_string(),
                content: content.as_bytes().to_vec(),
                container: None,
                children: Vec::new(),
            },
        );
    }

    /// A container that lists its children.
    pub fn folder(&self, path: &str, fingerprint: &str, children: &[&str]) {
        self.insert(
            path,
            StaticEntry {
                exists_id: None,
                fingerprint: fingerprint.to_string(),
                content: Vec::new(),
                container: Some(ContainerKind::Listing),
                children: children.iter().map(|child| mem(child)).collect(),
            },
        );
    }

    /// A container whose children are found by the extractor, one `-> locator` line per link.
    pub fn page(&self, path: &str, fingerprint: &str, links: &[&str]) {
        let content = links
            .iter()
            .map(|link| format!("-> {}\n", mem(link)))
            .collect::<String>();
        self.insert(
            path,
            StaticEntry {
                exists_id: None,
                fingerprint: fingerprint.to_string(),
                content: content.into_bytes(),
                container: Some(ContainerKind::Links),
                children: Vec::new(),
            },
        );
    }

    /// Overrides the exists id of an entity.
    pub fn alias(&self, path: &str, exists_id: &str) {
        if let Some(entry) = self.entries.lock().unwrap().get_mut(path) {
            entry.exists_id = Some(exists_id.to_string());
        }
    }

    pub fn remove(&self, path: &str) {
        self.entries.lock().unwrap().remove(path);
    }

    /// The paths of all streams that were actually read.
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }

    pub fn clear_opened(&self) {
        self.opened.lock().unwrap().clear();
    }

    fn entry(&self, locator: &Locator) -> Result<StaticEntry, ProviderError> {
        self.entries
            .lock()
            .unwrap()
            .get(locator.as_url().path())
            .cloned()
            .ok_or_else(|| ProviderError::io(locator.as_url().path(), std::io::ErrorKind::NotFound.into()))
    }
}

#[async_trait]
impl StreamProvider for StaticProvider {
    fn schemes(&self) -> &[&'static str] {
        &["mem"]
    }

    async fn add_first_metadata(
        &self,
        locator: &Locator,
        mut metadata: Metadata,
        _context: &CrawlContext,
    ) -> Result<Metadata, ProviderError> {
        if metadata.has_first_metadata() {
            return Ok(metadata);
        }
        let entry = self.entry(locator)?;
        let path = locator.as_url().path().to_string();
        metadata.resource_name = Some(locator.last_segment().unwrap_or("/").to_string());
        metadata.exists_id = Some(entry.exists_id.unwrap_or(path));
        metadata.fingerprint = Some(entry.fingerprint);
        metadata.container = entry.container;
        metadata.content_type = Some("text/plain".to_string());
        Ok(metadata)
    }

    async fn get_stream(
        &self,
        locator: &Locator,
        _metadata: &Metadata,
        _context: &CrawlContext,
    ) -> Result<LazyStream, ProviderError> {
        let entry = self.entry(locator)?;
        self.opened
            .lock()
            .unwrap()
            .push(locator.as_url().path().to_string());
        Ok(LazyStream::from_reader(std::io::Cursor::new(entry.content)))
    }

    async fn children(
        &self,
        locator: &Locator,
        _metadata: &Metadata,
        _context: &CrawlContext,
    ) -> Result<Vec<Locator>, ProviderError> {
        Ok(self.entry(locator)?.children)
    }
}
