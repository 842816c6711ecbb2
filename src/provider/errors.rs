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

use crate::history::HistoryError;
use reqwest::StatusCode;
use std::path::PathBuf;
use thiserror::Error;

/// Errors of the stream providers.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("The locator {locator} is not valid: {reason}")]
    InvalidLocator { locator: String, reason: String },
    #[error("No provider supports the scheme {0:?}")]
    UnsupportedScheme(String),
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("The path {0:?} is not valid utf-8")]
    NotUtf8(PathBuf),
    #[error("The path {0:?} is no maildir folder")]
    NoMaildir(PathBuf),
    #[error("The message {message} does not exist in {folder:?}")]
    MessageNotFound { folder: PathBuf, message: String },
    #[error(transparent)]
    Request(#[from] reqwest::Error),
    #[error("The request to {url} failed with {status}")]
    Status { url: String, status: StatusCode },
    #[error("{url} redirects to itself")]
    SelfRedirect { url: String },
    #[error("{url} needs more than {limit} redirects")]
    TooManyRedirects { url: String, limit: usize },
    #[error("The redirect of {url} has no usable location")]
    MissingLocation { url: String },
    #[error("The provider could not identify {0}")]
    MissingIdentifier(String),
    #[error(transparent)]
    History(#[from] HistoryError),
}

impl ProviderError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Errors that must abort the whole crawl instead of a single entity.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProviderError::History(_))
    }
}
