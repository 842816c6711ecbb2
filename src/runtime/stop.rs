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

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// A cooperative stop request for a running crawl.
///
/// The crawl checks [StopSignal::is_requested] before each entity. A requester
/// can wait until the crawl acknowledged the stop by finishing.
#[derive(Debug, Default)]
pub struct StopSignal {
    requested: AtomicBool,
    running: AtomicBool,
    acknowledged: Notify,
}

impl StopSignal {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Marks a crawl as running until the guard is dropped.
    pub fn start(self: &Arc<Self>) -> RunningGuard {
        self.running.store(true, Ordering::SeqCst);
        RunningGuard {
            signal: self.clone(),
        }
    }

    /// Requests a stop without waiting.
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    /// Requests a stop and waits until the running crawl finished.
    /// Returns immediately if nothing runs.
    pub async fn request_and_wait(&self) {
        let acknowledged = self.acknowledged.notified();
        tokio::pin!(acknowledged);
        acknowledged.as_mut().enable();
        self.requested.store(true, Ordering::SeqCst);
        if !self.running.load(Ordering::SeqCst) {
            self.requested.store(false, Ordering::SeqCst);
            return;
        }
        acknowledged.await;
    }
}

/// Acknowledges a pending stop request when dropped.
#[derive(Debug)]
pub struct RunningGuard {
    signal: Arc<StopSignal>,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.signal.running.store(false, Ordering::SeqCst);
        if self.signal.requested.swap(false, Ordering::SeqCst) {
            log::debug!("Acknowledged the stop request.");
            self.signal.acknowledged.notify_waiters();
        }
    }
}
