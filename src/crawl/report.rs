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

use crate::metadata::ModificationState;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use time::Duration;

/// The summary of a top level crawl.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct CrawlReport {
    pub new: u64,
    pub modified: u64,
    pub unmodified: u64,
    pub processed: u64,
    pub removed: u64,
    pub errors: u64,
    /// True if the crawl ended early because of a stop request.
    pub stopped: bool,
    pub elapsed: Duration,
}

impl CrawlReport {
    pub fn count(&mut self, state: ModificationState) {
        let counter = match state {
            ModificationState::New => &mut self.new,
            ModificationState::Modified => &mut self.modified,
            ModificationState::Unmodified => &mut self.unmodified,
            ModificationState::Processed => &mut self.processed,
            ModificationState::Removed => &mut self.removed,
            ModificationState::Error => &mut self.errors,
        };
        *counter += 1;
    }

    /// The number of classified entities, removed ones excluded.
    pub fn visited(&self) -> u64 {
        self.new + self.modified + self.unmodified + self.processed + self.errors
    }
}

impl Display for CrawlReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "new: {}, modified: {}, unmodified: {}, processed: {}, removed: {}, errors: {}",
            self.new, self.modified, self.unmodified, self.processed, self.removed, self.errors
        )?;
        if self.stopped {
            write!(f, " (stopped)")?;
        }
        write!(f, " in {}", self.elapsed)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn states_are_counted() {
        let mut report = CrawlReport::default();
        report.count(ModificationState::New);
        report.count(ModificationState::New);
        report.count(ModificationState::Removed);
        report.count(ModificationState::Error);
        assert_eq!(2, report.new);
        assert_eq!(1, report.removed);
        assert_eq!(3, report.visited());
        assert!(report.to_string().starts_with("new: 2, modified: 0"));
    }
}
