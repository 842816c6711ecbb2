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
use crate::format;
use crate::metadata::Metadata;
use crate::provider::LazyStream;
use async_trait::async_trait;

/// The headers of a mail that are copied into the fields.
const MESSAGE_FIELDS: [&'static str; 6] = ["Subject", "From", "To", "Cc", "Date", "Message-ID"];

/// Decodes the content as utf-8, invalid sequences are replaced.
#[derive(Debug, Default, Copy, Clone)]
pub struct TextExtractor;

#[async_trait]
impl ContentExtractor for TextExtractor {
    async fn extract(
        &self,
        stream: LazyStream,
        _metadata: &Metadata,
    ) -> Result<ExtractedContent, ExtractionError> {
        let bytes = read_all(stream).await?;
        Ok(ExtractedContent::from_text(String::from_utf8_lossy(&bytes)))
    }
}

/// Splits a mail into the common headers and the body text.
#[derive(Debug, Default, Copy, Clone)]
pub struct MessageExtractor;

#[async_trait]
impl ContentExtractor for MessageExtractor {
    async fn extract(
        &self,
        stream: LazyStream,
        _metadata: &Metadata,
    ) -> Result<ExtractedContent, ExtractionError> {
        let bytes = read_all(stream).await?;
        let parts = format::split_message(&bytes);
        let mut content = ExtractedContent::from_text(String::from_utf8_lossy(parts.body));
        for name in MESSAGE_FIELDS {
            if let Some(value) = parts.header(name) {
                content
                    .fields
                    .insert(name.to_ascii_lowercase().replace('-', "_"), value.to_string());
            }
        }
        Ok(content)
    }
}
