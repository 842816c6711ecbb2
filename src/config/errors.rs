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

use thiserror::Error;

/// Errors in the setup of a crawl. They are raised before any entity is visited.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),
    #[error("Invalid scope pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
    #[error("The crawler needs a content extractor.")]
    MissingExtractor,
    #[error("The crawler needs a data sink.")]
    MissingSink,
    #[error("No provider supports the scheme {scheme:?} of {locator}")]
    UnsupportedScheme { locator: String, scheme: String },
}
