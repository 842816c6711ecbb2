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

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use time::Duration;

/// The settings of the http provider.
#[derive(Debug, Clone, Deserialize, Serialize, Eq, PartialEq)]
#[serde(rename(serialize = "Http"))]
#[serde(default)]
pub struct HttpConfig {
    /// The user agent used by the crawler
    pub user_agent: UserAgent,
    /// The max redirections allowed for a request. (default: 5 like Google-Bot)
    pub redirect_limit: usize,
    /// Timeout for establishing a connection. By default 10s, None disables it.
    pub connect_timeout: Option<Duration>,
    /// Timeout for a whole request. By default 30s, None disables it.
    pub request_timeout: Option<Duration>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: UserAgent::default(),
            redirect_limit: 5,
            connect_timeout: Some(Duration::seconds(10)),
            request_timeout: Some(Duration::seconds(30)),
        }
    }
}

/// The selected user agent
#[derive(Debug, Default, Clone, Deserialize, Serialize, EnumString, Display, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum UserAgent {
    /// Uses the default user agent
    #[default]
    #[strum(ascii_case_insensitive = true)]
    Default,
    /// Uses a custom user agent
    #[strum(default, ascii_case_insensitive = true)]
    Custom(String),
}

impl UserAgent {
    const DEFAULT_UA: &'static str = concat!(
        "Crawler/",
        env!("CARGO_PKG_NAME"),
        "/",
        env!("CARGO_PKG_VERSION")
    );

    /// Returns the useragent string
    pub fn get_user_agent(&self) -> &str {
        match self {
            UserAgent::Default => UserAgent::DEFAULT_UA,
            UserAgent::Custom(user_agent) => user_agent,
        }
    }
}

impl AsRef<str> for UserAgent {
    fn as_ref(&self) -> &str {
        self.get_user_agent()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn user_agents_parse_from_the_command_line() {
        assert_eq!(UserAgent::Default, UserAgent::from_str("default").unwrap());
        assert_eq!(
            UserAgent::Custom("MyBot/1.0".to_string()),
            UserAgent::from_str("MyBot/1.0").unwrap()
        );
        assert!(UserAgent::Default.get_user_agent().contains("linyphia"));
    }
}
