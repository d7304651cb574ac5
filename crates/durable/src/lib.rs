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

//! A durable, segmented, quota-bounded append log with token-based
//! at-least-once read semantics.
//!
//! Records are appended as self-delimiting frames into numbered segment
//! files. The active segment rotates once it crosses a size threshold, and
//! the oldest sealed segments are evicted when the folder exceeds its
//! storage quota. A single consumer checks records out with
//! [`DurableLog::read`], then acknowledges them with
//! [`DurableLog::resolve`]: success advances the read cursor (deleting
//! fully-consumed segments), failure redelivers the same bytes on the next
//! read.
//!
//! [`DurableSource`] wraps a log behind a mutex and the
//! [`spool_dataflow::Source`] trait, so the uploader's dispatch loop can
//! treat disk-backed data as one more prioritized source.

pub mod builder;
pub mod config;
pub mod error;
mod frame;
pub mod log;
pub mod path;
mod segment;
pub mod source;

pub use builder::DurableLogBuilder;
pub use config::DurableLogConfig;
pub use error::{DurableLogError, Result};
pub use log::{DataToken, DurableLog, StagedRead};
pub use source::DurableSource;
