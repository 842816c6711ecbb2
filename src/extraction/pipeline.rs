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

use crate::extraction::{ContentExtractor, ExtractedContent, ExtractionError};
use crate::metadata::Metadata;
use crate::provider::LazyStream;
use async_trait::async_trait;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// A middleware around the extractor.
///
/// A layer may inspect or replace the stream and the result, and decides
/// whether the rest of the chain runs at all by calling [Next::run].
#[async_trait]
pub trait ExtractionLayer: Send + Sync {
    async fn extract(
        &self,
        stream: LazyStream,
        metadata: &Metadata,
        next: Next<'_>,
    ) -> Result<ExtractedContent, ExtractionError>;
}

/// The remaining part of the chain.
#[derive(Copy, Clone)]
pub struct Next<'a> {
    layers: &'a [Arc<dyn ExtractionLayer>],
    extractor: &'a dyn ContentExtractor,
}

impl<'a> Next<'a> {
    pub async fn run(
        self,
        stream: LazyStream,
        metadata: &Metadata,
    ) -> Result<ExtractedContent, ExtractionError> {
        match self.layers.split_first() {
            Some((layer, layers)) => {
                let next = Next {
                    layers,
                    extractor: self.extractor,
                };
                layer.extract(stream, metadata, next).await
            }
            None => self.extractor.extract(stream, metadata).await,
        }
    }
}

/// The extractor together with its layers, the first added layer is the outermost.
#[derive(Clone)]
pub struct ExtractionPipeline {
    layers: Vec<Arc<dyn ExtractionLayer>>,
    extractor: Arc<dyn ContentExtractor>,
}

impl ExtractionPipeline {
    pub fn new(extractor: Arc<dyn ContentExtractor>) -> Self {
        Self {
            layers: Vec::new(),
            extractor,
        }
    }

    pub fn layer(mut self, layer: Arc<dyn ExtractionLayer>) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub async fn extract(
        &self,
        stream: LazyStream,
        metadata: &Metadata,
    ) -> Result<ExtractedContent, ExtractionError> {
        Next {
            layers: &self.layers,
            extractor: self.extractor.as_ref(),
        }
        .run(stream, metadata)
        .await
    }
}

impl Debug for ExtractionPipeline {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionPipeline")
            .field("layers", &self.layers.len())
            .finish_non_exhaustive()
    }
}
