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

//! Receivers of the classified entities.

mod jsonl;

pub use jsonl::JsonLinesSink;

use crate::crawl::EntityError;
use crate::extraction::ExtractedContent;
use crate::metadata::Metadata;
use async_trait::async_trait;
use thiserror::Error;

/// Errors of a sink abort the crawl.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error(transparent)]
    IOError(#[from] std::io::Error),
    #[error(transparent)]
    Serialisation(#[from] serde_json::Error),
    #[error("The sink rejected {0}: {1}")]
    Rejected(String, String),
}

/// Receives the entities of a crawl, the modification state is already set in the metadata.
///
/// Unmodified and processed entities are never reported.
#[async_trait]
pub trait DataSink: Send + Sync {
    async fn on_new(
        &self,
        metadata: &Metadata,
        content: &ExtractedContent,
    ) -> Result<(), SinkError>;

    async fn on_modified(
        &self,
        metadata: &Metadata,
        content: &ExtractedContent,
    ) -> Result<(), SinkError>;

    /// Called for every entity of the history that was not seen in the finished crawl.
    async fn on_removed(&self, metadata: &Metadata) -> Result<(), SinkError>;

    async fn on_error(&self, metadata: &Metadata, error: &EntityError) -> Result<(), SinkError>;
}
