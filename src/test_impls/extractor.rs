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

use crate::extraction::{read_all, ContentExtractor, ExtractedContent, ExtractionError};
use crate::metadata::Metadata;
use crate::provider::{LazyStream, Locator};
use async_trait::async_trait;
use std::sync::Mutex;

/// Returns the content as text and every `-> locator` line as link.
///
/// Content starting with `FAIL` fails the extraction.
#[derive(Debug, Default)]
pub struct ScriptedExtractor {
    extracted: Mutex<Vec<String>>,
}

impl ScriptedExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// The exists ids of all extracted entities in order.
    pub fn extracted(&self) -> Vec<String> {
        self.extracted.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.extracted.lock().unwrap().clear();
    }
}

#[async_trait]
impl ContentExtractor for ScriptedExtractor {
    async fn extract(
        &self,
        stream: LazyStream,
        metadata: &Metadata,
    ) -> Result<ExtractedContent, ExtractionError> {
        self.extracted
            .lock()
            .unwrap()
            .push(metadata.exists_id.clone().unwrap_or_default());
        let text = String::from_utf8(read_all(stream).await?).unwrap();
        if text.starts_with("FAIL") {
            return Err(ExtractionError::Failed {
                name: metadata.display_name().to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        let links = text
            .lines()
            .filter_map(|line| line.strip_prefix("-> "))
            .map(|link| Locator::parse(link).unwrap())
            .collect();
        Ok(ExtractedContent {
            text,
            links,
            ..ExtractedContent::default()
        })
    }
}
