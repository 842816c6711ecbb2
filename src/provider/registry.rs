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

use crate::config::HttpConfig;
use crate::provider::{
    FileProvider, HttpProvider, MaildirProvider, ProviderError, StreamProvider,
};
use itertools::Itertools;
use std::collections::HashMap;
use std::sync::Arc;

/// Maps locator schemes to their providers.
///
/// Built once at startup and handed to the crawler.
#[derive(Debug, Clone, Default)]
pub struct StreamProviderRegistry {
    providers: HashMap<String, Arc<dyn StreamProvider>>,
}

impl StreamProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the file, http and maildir providers.
    pub fn with_defaults(http: &HttpConfig) -> Result<Self, ProviderError> {
        let mut registry = Self::new();
        registry.register(Arc::new(FileProvider::new()));
        registry.register(Arc::new(HttpProvider::from_config(http)?));
        registry.register(Arc::new(MaildirProvider::new()));
        Ok(registry)
    }

    /// Registers `provider` for all of its schemes. Replaces previous registrations.
    pub fn register(&mut self, provider: Arc<dyn StreamProvider>) {
        for scheme in provider.schemes() {
            if let Some(previous) = self
                .providers
                .insert(scheme.to_ascii_lowercase(), provider.clone())
            {
                log::debug!("Replaced {previous:?} for {scheme}.");
            }
        }
    }

    pub fn with(mut self, provider: Arc<dyn StreamProvider>) -> Self {
        self.register(provider);
        self
    }

    pub fn get(&self, scheme: &str) -> Result<&Arc<dyn StreamProvider>, ProviderError> {
        self.providers
            .get(scheme)
            .or_else(|| self.providers.get(&scheme.to_ascii_lowercase()))
            .ok_or_else(|| ProviderError::UnsupportedScheme(scheme.to_string()))
    }

    pub fn supports(&self, scheme: &str) -> bool {
        self.get(scheme).is_ok()
    }

    /// The supported schemes, sorted.
    pub fn schemes(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).sorted().collect()
    }
}
