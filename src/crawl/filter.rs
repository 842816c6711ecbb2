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

use crate::config::ConfigError;
use crate::provider::Locator;
use regex::RegexSet;

/// Decides which discovered locators are followed.
#[derive(Debug, Clone)]
pub struct ScopeFilter {
    include: RegexSet,
    exclude: RegexSet,
}

impl Default for ScopeFilter {
    fn default() -> Self {
        Self {
            include: RegexSet::empty(),
            exclude: RegexSet::empty(),
        }
    }
}

impl ScopeFilter {
    pub fn new<I, E, S1, S2>(include: I, exclude: E) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S1>,
        E: IntoIterator<Item = S2>,
        S1: AsRef<str>,
        S2: AsRef<str>,
    {
        Ok(Self {
            include: RegexSet::new(include)?,
            exclude: RegexSet::new(exclude)?,
        })
    }

    /// Accepts everything.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// A locator is accepted if it matches an include pattern (or there are none)
    /// and no exclude pattern.
    pub fn accepts(&self, locator: &Locator) -> bool {
        let value = locator.as_str();
        (self.include.is_empty() || self.include.is_match(value)) && !self.exclude.is_match(value)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_filters_accept_everything() {
        let filter = ScopeFilter::allow_all();
        assert!(filter.accepts(&Locator::parse("https://example.com").unwrap()));
    }

    #[test]
    fn excludes_win_over_includes() {
        let filter = ScopeFilter::new([r"^https://example\.com/"], [r"\.pdf$"]).unwrap();
        assert!(filter.accepts(&Locator::parse("https://example.com/a.html").unwrap()));
        assert!(!filter.accepts(&Locator::parse("https://example.com/a.pdf").unwrap()));
        assert!(!filter.accepts(&Locator::parse("https://other.com/a.html").unwrap()));
    }

    #[test]
    fn broken_patterns_are_config_errors() {
        let result = ScopeFilter::new(["("], Vec::<String>::new());
        assert!(matches!(result, Err(ConfigError::InvalidPattern(_))));
    }
}
