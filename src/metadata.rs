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

use crate::provider::Locator;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumString};

/// The classification of an entity in a single crawl step. Never persisted.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ModificationState {
    New,
    Modified,
    Unmodified,
    /// Already seen in the running session, e.g. because of a cycle.
    Processed,
    Removed,
    Error,
}

/// How the children of a container are found.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum ContainerKind {
    /// The provider lists the children, e.g. directories and mail folders.
    Listing,
    /// The extractor finds the children as links, e.g. web pages.
    Links,
}

/// Everything known about an entity, handed from the provider through the
/// extraction to the sink.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub source: Option<String>,
    pub resource_name: Option<String>,
    pub exists_id: Option<String>,
    pub fingerprint: Option<String>,
    pub master_id: Option<String>,
    pub content_type: Option<String>,
    pub container: Option<ContainerKind>,
    pub modification_state: Option<ModificationState>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, String>,
}

impl Metadata {
    /// Creates the metadata of an entity that is only known by its locator.
    pub fn for_locator(locator: &Locator) -> Self {
        Self {
            source: Some(locator.to_string()),
            ..Self::default()
        }
    }

    /// Metadata of an entity only known from the history.
    pub fn for_exists_id(exists_id: impl Into<String>) -> Self {
        Self {
            exists_id: Some(exists_id.into()),
            ..Self::default()
        }
    }

    pub fn with_master_id(mut self, master_id: Option<String>) -> Self {
        self.master_id = master_id;
        self
    }

    /// True if a provider already attached everything needed for the classification.
    pub fn has_first_metadata(&self) -> bool {
        self.source.is_some()
            && self.resource_name.is_some()
            && self.exists_id.is_some()
            && self.fingerprint.is_some()
    }

    pub fn is_container(&self) -> bool {
        self.container.is_some()
    }

    /// The best human readable name of the entity.
    pub fn display_name(&self) -> &str {
        self.source
            .as_deref()
            .or(self.exists_id.as_deref())
            .or(self.resource_name.as_deref())
            .unwrap_or("<unknown>")
    }

    pub fn set_field(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn first_metadata_needs_all_four_fields() {
        let locator = Locator::parse("file:///tmp/a.txt").unwrap();
        let mut metadata = Metadata::for_locator(&locator);
        assert!(!metadata.has_first_metadata());
        metadata.resource_name = Some("a.txt".to_string());
        metadata.exists_id = Some("/tmp/a.txt".to_string());
        assert!(!metadata.has_first_metadata());
        metadata.fingerprint = Some("1".to_string());
        assert!(metadata.has_first_metadata());
    }

    #[test]
    fn states_are_written_in_upper_case() {
        assert_eq!("UNMODIFIED", ModificationState::Unmodified.to_string());
        assert_eq!(
            "\"REMOVED\"",
            serde_json::to_string(&ModificationState::Removed).unwrap()
        );
    }
}
