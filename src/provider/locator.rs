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

use crate::provider::ProviderError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use url::Url;

/// The address of an entity. The scheme selects the provider.
///
/// Bare paths are treated as `file` locators.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locator(Url);

impl Locator {
    pub fn new(url: Url) -> Self {
        Self(url)
    }

    pub fn parse(value: &str) -> Result<Self, ProviderError> {
        match Url::parse(value) {
            // Single letters are drive letters and not schemes.
            Ok(url) if url.scheme().len() > 1 => Ok(Self(url)),
            _ => Self::from_path(value),
        }
    }

    /// Creates a `file` locator, relative paths are resolved against the working directory.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ProviderError> {
        let path = path.as_ref();
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map_err(|err| ProviderError::io(path, err))?
                .join(path)
        };
        Url::from_file_path(&absolute)
            .map(Self)
            .map_err(|_| ProviderError::InvalidLocator {
                locator: absolute.display().to_string(),
                reason: "not an absolute path".to_string(),
            })
    }

    pub fn scheme(&self) -> &str {
        self.0.scheme()
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn fragment(&self) -> Option<&str> {
        self.0.fragment()
    }

    /// The local path for locators of the file like schemes, e.g. `maildir`.
    pub fn to_file_path(&self) -> Result<PathBuf, ProviderError> {
        let invalid = || ProviderError::InvalidLocator {
            locator: self.to_string(),
            reason: "no local path".to_string(),
        };
        if self.0.scheme() == "file" {
            return self.0.to_file_path().map_err(|_| invalid());
        }
        Url::parse(&format!("file://{}", self.0.path()))
            .map_err(|_| invalid())?
            .to_file_path()
            .map_err(|_| invalid())
    }

    /// The last non empty path segment.
    pub fn last_segment(&self) -> Option<&str> {
        self.0
            .path_segments()?
            .filter(|segment| !segment.is_empty())
            .last()
    }
}

impl Display for Locator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl FromStr for Locator {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Url> for Locator {
    fn from(value: Url) -> Self {
        Self(value)
    }
}

impl AsRef<str> for Locator {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
