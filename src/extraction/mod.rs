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

//! Turns the byte stream of an entity into text, fields and links.

mod errors;
mod html;
mod layers;
mod pipeline;
mod text;

pub use errors::ExtractionError;
pub use html::HtmlExtractor;
pub use layers::{SizeLimitLayer, TimingLayer};
pub use pipeline::{ExtractionLayer, ExtractionPipeline, Next};
pub use text::{MessageExtractor, TextExtractor};

use crate::format;
use crate::metadata::Metadata;
use crate::provider::{LazyStream, Locator};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::io::AsyncReadExt;

/// The result of an extraction.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ExtractedContent {
    pub text: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, String>,
    /// Outgoing links, already resolved against the locator of the entity.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Locator>,
}

impl ExtractedContent {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// Extracts the content of a single entity.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    async fn extract(
        &self,
        stream: LazyStream,
        metadata: &Metadata,
    ) -> Result<ExtractedContent, ExtractionError>;
}

/// Reads the whole stream.
pub(crate) async fn read_all(mut stream: LazyStream) -> Result<Vec<u8>, ExtractionError> {
    let mut buffer = Vec::new();
    stream.read_to_end(&mut buffer).await?;
    stream.close();
    Ok(buffer)
}

/// Chooses the extractor by the content type of the entity.
///
/// Html is parsed for text and links, mails are split into headers and body and
/// textual data is decoded as utf-8. Provider listed containers and binary data
/// yield empty content without reading the stream. Without content type the
/// data is sniffed.
#[derive(Debug, Default, Copy, Clone)]
pub struct DefaultExtractor;

impl DefaultExtractor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ContentExtractor for DefaultExtractor {
    async fn extract(
        &self,
        mut stream: LazyStream,
        metadata: &Metadata,
    ) -> Result<ExtractedContent, ExtractionError> {
        if metadata.container == Some(crate::metadata::ContainerKind::Listing) {
            stream.close();
            return Ok(ExtractedContent::default());
        }
        match metadata.content_type.as_deref() {
            Some(value) if format::is_html(value) => HtmlExtractor.extract(stream, metadata).await,
            Some(format::MESSAGE_RFC822) => MessageExtractor.extract(stream, metadata).await,
            Some(value) if format::is_textual(value) => {
                TextExtractor.extract(stream, metadata).await
            }
            Some(value) => {
                log::debug!("Skip the content of {}, {value} is binary.", metadata.display_name());
                stream.close();
                Ok(ExtractedContent::default())
            }
            None => {
                let bytes = read_all(stream).await?;
                if format::looks_like_html(&bytes) {
                    Ok(html::extract_html(&bytes, metadata))
                } else if let Ok(text) = String::from_utf8(bytes) {
                    Ok(ExtractedContent::from_text(text))
                } else {
                    Ok(ExtractedContent::default())
                }
            }
        }
    }
}
