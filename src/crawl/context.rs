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

use crate::config::{ConfigError, CrawlConfig};
use crate::crawl::ScopeFilter;
use crate::history::{HistoryStore, TemporaryArea};
use crate::runtime::StopSignal;
use std::sync::Arc;

/// The settings and the state carried through a crawl.
///
/// The history is owned by the context and opened and closed around each
/// crawl. Without history and with cycle detection a temporary one is used.
#[derive(Debug)]
pub struct CrawlContext {
    depth: usize,
    max_depth: Option<usize>,
    stop: Arc<StopSignal>,
    cycle_detection: bool,
    check_removals: bool,
    interrupt_on_error: bool,
    verbose: bool,
    filter: ScopeFilter,
    history: Option<HistoryStore>,
    temp_area: Option<TemporaryArea>,
}

impl Default for CrawlContext {
    fn default() -> Self {
        Self {
            depth: 0,
            max_depth: None,
            stop: StopSignal::new(),
            cycle_detection: true,
            check_removals: true,
            interrupt_on_error: false,
            verbose: false,
            filter: ScopeFilter::allow_all(),
            history: None,
            temp_area: None,
        }
    }
}

impl CrawlContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &CrawlConfig) -> Result<Self, ConfigError> {
        let mut context = Self::new()
            .with_max_depth(config.max_depth)
            .with_cycle_detection(config.cycle_detection)
            .with_check_removals(config.check_removals)
            .with_interrupt_on_error(config.interrupt_on_error)
            .with_verbose(config.verbose)
            .with_filter(ScopeFilter::new(&config.include, &config.exclude)?);
        if let Some(ref path) = config.history_path {
            context = context.with_history(HistoryStore::new(path.clone()));
        }
        if let Some(ref path) = config.temp_area {
            context = context.with_temp_area(TemporaryArea::new(path.clone()));
        }
        Ok(context)
    }

    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_cycle_detection(mut self, cycle_detection: bool) -> Self {
        self.cycle_detection = cycle_detection;
        self
    }

    pub fn with_check_removals(mut self, check_removals: bool) -> Self {
        self.check_removals = check_removals;
        self
    }

    pub fn with_interrupt_on_error(mut self, interrupt_on_error: bool) -> Self {
        self.interrupt_on_error = interrupt_on_error;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_filter(mut self, filter: ScopeFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_history(mut self, history: HistoryStore) -> Self {
        self.history = Some(history);
        self
    }

    pub fn with_temp_area(mut self, temp_area: TemporaryArea) -> Self {
        self.temp_area = Some(temp_area);
        self
    }

    pub fn with_stop_signal(mut self, stop: Arc<StopSignal>) -> Self {
        self.stop = stop;
        self
    }

    /// The depth of the entity in progress, the start locator has depth 0.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub(crate) fn set_depth(&mut self, depth: usize) {
        self.depth = depth;
    }

    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    /// True if the children of an entity at `depth` are within the depth limit.
    pub fn allows_children_of(&self, depth: usize) -> bool {
        self.max_depth.map_or(true, |max| depth < max)
    }

    pub fn stop_signal(&self) -> &Arc<StopSignal> {
        &self.stop
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop.is_requested()
    }

    pub fn cycle_detection(&self) -> bool {
        self.cycle_detection
    }

    pub fn check_removals(&self) -> bool {
        self.check_removals
    }

    pub fn interrupt_on_error(&self) -> bool {
        self.interrupt_on_error
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn filter(&self) -> &ScopeFilter {
        &self.filter
    }

    pub fn history(&self) -> Option<&HistoryStore> {
        self.history.as_ref()
    }

    pub fn history_mut(&mut self) -> Option<&mut HistoryStore> {
        self.history.as_mut()
    }

    pub(crate) fn replace_history(&mut self, history: Option<HistoryStore>) -> Option<HistoryStore> {
        std::mem::replace(&mut self.history, history)
    }

    pub fn temp_area(&self) -> Option<&TemporaryArea> {
        self.temp_area.as_ref()
    }
}
