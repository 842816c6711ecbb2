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

use crate::crawl::EntityError;
use crate::extraction::ExtractedContent;
use crate::metadata::{Metadata, ModificationState};
use crate::sink::{DataSink, SinkError};
use async_trait::async_trait;
use std::sync::Mutex;

/// Something the [RecordingSink] received.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub state: ModificationState,
    pub metadata: Metadata,
    pub content: Option<ExtractedContent>,
    pub error: Option<String>,
}

impl Recorded {
    pub fn exists_id(&self) -> &str {
        self.metadata.exists_id.as_deref().unwrap_or_default()
    }
}

/// Remembers everything it receives.
#[derive(Debug, Default)]
pub struct RecordingSink {
    recorded: Mutex<Vec<Recorded>>,
    fail_on: Mutex<Option<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects the entity with this exists id.
    pub fn fail_on(&self, exists_id: impl Into<String>) {
        *self.fail_on.lock().unwrap() = Some(exists_id.into());
    }

    pub fn accept_all(&self) {
        *self.fail_on.lock().unwrap() = None;
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.recorded.lock().unwrap().clone()
    }

    /// The exists ids with `state`, sorted.
    pub fn ids_with(&self, state: ModificationState) -> Vec<String> {
        let mut ids: Vec<String> = self
            .recorded
            .lock()
            .unwrap()
            .iter()
            .filter(|recorded| recorded.state == state)
            .map(|recorded| recorded.exists_id().to_string())
            .collect();
        ids.sort();
        ids
    }

    pub fn clear(&self) {
        self.recorded.lock().unwrap().clear();
    }

    fn record(
        &self,
        state: ModificationState,
        metadata: &Metadata,
        content: Option<&ExtractedContent>,
        error: Option<String>,
    ) -> Result<(), SinkError> {
        let exists_id = metadata.exists_id.clone().unwrap_or_default();
        if self.fail_on.lock().unwrap().as_deref() == Some(exists_id.as_str()) {
            return Err(SinkError::Rejected(exists_id, "rejected by test".to_string()));
        }
        assert_eq!(Some(state), metadata.modification_state);
        self.recorded.lock().unwrap().push(Recorded {
            state,
            metadata: metadata.clone(),
            content: content.cloned(),
            error,
        });
        Ok(())
    }
}

#[async_trait]
impl DataSink for RecordingSink {
    async fn on_new(
        &self,
        metadata: &Metadata,
        content: &ExtractedContent,
    ) -> Result<(), SinkError> {
        self.record(ModificationState::New, metadata, Some(content), None)
    }

    async fn on_modified(
        &self,
        metadata: &Metadata,
        content: &ExtractedContent,
    ) -> Result<(), SinkError> {
        self.record(ModificationState::Modified, metadata, Some(content), None)
    }

    async fn on_removed(&self, metadata: &Metadata) -> Result<(), SinkError> {
        self.record(ModificationState::Removed, metadata, None, None)
    }

    async fn on_error(&self, metadata: &Metadata, error: &EntityError) -> Result<(), SinkError> {
        self.record(
            ModificationState::Error,
            metadata,
            None,
            Some(error.to_string()),
        )
    }
}
