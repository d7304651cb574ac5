// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! In-memory dataflow building blocks for the spool buffering layer.
//!
//! The pieces fit together like this:
//! - [`StatusMonitor`] is an observable two-state flag a source flips
//!   whenever its "has unread data" condition changes.
//! - [`ObservedQueue`] implementations own a monitor and keep it in sync
//!   with queue occupancy on every mutation.
//! - [`QueueMonitor`] registers many prioritized sources and drains the
//!   highest-priority one currently reporting data, sleeping on a shared
//!   [`StatusGroup`] instead of polling queue contents.

pub mod error;
pub mod monitor;
pub mod queue;
pub mod source;
pub mod status;

pub use error::{DataflowError, Result};
pub use monitor::{PriorityLevel, PriorityOptions, QueueMonitor};
pub use queue::{BasicObservedQueue, BlockingObservedQueue, SyncObservedQueue};
pub use source::{ObservedQueue, Sink, Source};
pub use status::{Status, StatusGroup, StatusMonitor};
