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

//! The crawl history.
//!
//! Every entity is stored with its content fingerprint and the time it was
//! last seen. A crawl session bumps that time for every visited entity, so
//! whatever was not bumped when the session ends has disappeared from the
//! source. This keeps the removal detection independent of how the source is
//! structured, at the price of one timestamp write per unmodified entity.

mod clock;
mod errors;
mod reader;
mod record;
mod stale;
mod store;
mod temporary;

pub use clock::*;
pub use errors::*;
pub use reader::HistoryReader;
pub use record::HistoryRecord;
pub use stale::StaleEntries;
pub use store::*;
pub use temporary::*;
