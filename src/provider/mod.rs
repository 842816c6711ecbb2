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

mod errors;
mod file;
mod http;
mod locator;
mod maildir;
mod registry;
mod stream;

pub use errors::ProviderError;
pub use file::FileProvider;
pub use http::HttpProvider;
pub use locator::Locator;
pub use maildir::MaildirProvider;
pub use registry::StreamProviderRegistry;
pub use stream::LazyStream;

use crate::crawl::CrawlContext;
use crate::metadata::Metadata;
use async_trait::async_trait;
use std::fmt::Debug;
use std::time::SystemTime;

/// Turns a locator into the metadata needed for the classification and into a
/// lazily opened byte stream.
#[async_trait]
pub trait StreamProvider: Debug + Send + Sync {
    /// The locator schemes handled by this provider.
    fn schemes(&self) -> &[&'static str];

    /// Attaches source, resource name, exists id and fingerprint.
    ///
    /// Must be cheap and must return immediately if everything is already present.
    async fn add_first_metadata(
        &self,
        locator: &Locator,
        metadata: Metadata,
        context: &CrawlContext,
    ) -> Result<Metadata, ProviderError>;

    /// Returns the content of the entity. Nothing is opened before the first read.
    async fn get_stream(
        &self,
        locator: &Locator,
        metadata: &Metadata,
        context: &CrawlContext,
    ) -> Result<LazyStream, ProviderError>;

    /// Lists the children of a [crate::metadata::ContainerKind::Listing] container in a stable order.
    async fn children(
        &self,
        _locator: &Locator,
        _metadata: &Metadata,
        _context: &CrawlContext,
    ) -> Result<Vec<Locator>, ProviderError> {
        Ok(Vec::new())
    }

    /// Called once the crawler is done with the entity. Drops anything held for a stream that was never requested.
    fn release(&self, _locator: &Locator) {}
}

/// The modification time in nanoseconds since the unix epoch, the fingerprint of local data.
pub(crate) fn modified_nanos(modified: SystemTime) -> u128 {
    match modified.duration_since(SystemTime::UNIX_EPOCH) {
        Ok(value) => value.as_nanos(),
        Err(_) => 0,
    }
}
