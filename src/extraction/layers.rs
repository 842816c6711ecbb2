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

use crate::extraction::{ExtractedContent, ExtractionError, ExtractionLayer, Next};
use crate::metadata::Metadata;
use crate::provider::LazyStream;
use async_trait::async_trait;
use tokio::io::AsyncReadExt;

/// Logs how long the extraction of every entity took.
#[derive(Debug, Default, Copy, Clone)]
pub struct TimingLayer;

#[async_trait]
impl ExtractionLayer for TimingLayer {
    async fn extract(
        &self,
        stream: LazyStream,
        metadata: &Metadata,
        next: Next<'_>,
    ) -> Result<ExtractedContent, ExtractionError> {
        let started = std::time::Instant::now();
        let result = next.run(stream, metadata).await;
        log::debug!(
            "Extracted {} in {:?} (success: {})",
            metadata.display_name(),
            started.elapsed(),
            result.is_ok()
        );
        result
    }
}

/// Truncates the stream after `max_bytes`.
#[derive(Debug, Copy, Clone)]
pub struct SizeLimitLayer {
    max_bytes: u64,
}

impl SizeLimitLayer {
    pub fn new(max_bytes: u64) -> Self {
        Self { max_bytes }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }
}

#[async_trait]
impl ExtractionLayer for SizeLimitLayer {
    async fn extract(
        &self,
        stream: LazyStream,
        metadata: &Metadata,
        next: Next<'_>,
    ) -> Result<ExtractedContent, ExtractionError> {
        next.run(LazyStream::from_reader(stream.take(self.max_bytes)), metadata)
            .await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::extraction::{ExtractionPipeline, TextExtractor};
    use std::sync::Arc;

    #[tokio::test]
    async fn content_is_truncated() {
        let pipeline = ExtractionPipeline::new(Arc::new(TextExtractor))
            .layer(Arc::new(TimingLayer))
            .layer(Arc::new(SizeLimitLayer::new(5)));
        let content = pipeline
            .extract(
                LazyStream::from_reader(&b"Hello World"[..]),
                &Metadata::default(),
            )
            .await
            .unwrap();
        assert_eq!("Hello", content.text);
    }
}
