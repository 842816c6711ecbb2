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

use crate::config::{ConfigError, CrawlConfig, HttpConfig, SystemConfig, UserAgent};
use camino::Utf8Path;
use config::Config;
use serde::{Deserialize, Serialize};
use time::Duration;

/// The settings of read only views on a history.
#[derive(Debug, Clone, Deserialize, Serialize, Eq, PartialEq)]
#[serde(rename(serialize = "Reader"))]
#[serde(default)]
pub struct ReaderConfig {
    /// How old the view of a reader may get before it catches up. (default: 5s)
    pub refresh_interval: Duration,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::seconds(5),
        }
    }
}

/// A collection of all config used in a crawl.
#[derive(Debug, Default, Clone, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename(serialize = "Config"))]
#[serde(default)]
pub struct Configs {
    pub system: SystemConfig,
    pub crawl: CrawlConfig,
    pub http: HttpConfig,
    pub reader: ReaderConfig,
}

impl Configs {
    /// Loads the configs from `./linyphia.*`, the file at `path` and the environment,
    /// in this order.
    pub fn load(path: Option<&Utf8Path>) -> Result<Self, ConfigError> {
        let mut builder =
            Config::builder().add_source(config::File::with_name("./linyphia").required(false));
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path.as_std_path()));
        }
        Ok(builder
            .add_source(config::Environment::with_prefix("LINYPHIA").separator("."))
            .build()?
            .try_deserialize()?)
    }

    /// A config showing every setting, written by `linyphia init`.
    pub fn example() -> Self {
        let mut configs = Self::default();
        configs.crawl.max_depth = Some(5);
        configs.crawl.history_path = Some("linyphia_history".into());
        configs.crawl.exclude = vec![r"/\.git/".to_string(), r"\.tmp$".to_string()];
        configs.http.user_agent = UserAgent::Custom("My User Agent".to_string());
        configs
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use camino::Utf8PathBuf;

    #[test]
    fn configs_load_from_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("custom.json")).unwrap();
        let mut expected = Configs::example();
        expected.crawl.verbose = true;
        expected.reader.refresh_interval = Duration::seconds(1);
        std::fs::write(&path, serde_json::to_string_pretty(&expected).unwrap()).unwrap();

        let loaded = Configs::load(Some(&path)).unwrap();
        assert_eq!(expected, loaded);
    }

    #[test]
    fn partial_files_are_completed_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("partial.json")).unwrap();
        std::fs::write(&path, r#"{"crawl": {"max_depth": 2, "check_removals": false}}"#).unwrap();

        let loaded = Configs::load(Some(&path)).unwrap();
        assert_eq!(Some(2), loaded.crawl.max_depth);
        assert!(!loaded.crawl.check_removals);
        assert!(loaded.crawl.cycle_detection);
        assert_eq!(HttpConfig::default(), loaded.http);
    }

    #[test]
    fn missing_explicit_files_fail() {
        let result = Configs::load(Some(Utf8Path::new("/does/not/exist/linyphia.json")));
        assert!(matches!(result, Err(ConfigError::Load(_))));
    }
}
