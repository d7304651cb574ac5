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

//! Capability traits at the seams of the dataflow layer.
//!
//! Producers talk to a [`Sink`], consumers to a [`Source`]. A queue that is
//! both, and that keeps an attached [`StatusMonitor`] in sync with its
//! occupancy, is an [`ObservedQueue`]. The durable on-disk log implements
//! [`Source`] as well, which is what lets a
//! [`QueueMonitor`](crate::QueueMonitor) multiplex memory queues and the
//! disk-backed log through one interface.

use std::{sync::Arc, time::Duration};

use crate::status::StatusMonitor;

/// The producer side of a queue.
pub trait Sink<T> {
    /// Offer one value without blocking.
    ///
    /// Returns the value back as `Err` when the sink rejects it (for
    /// example, a bounded queue that is full).
    fn enqueue(&self, value: T) -> Result<(), T>;

    /// Offer one value, blocking up to `timeout` for capacity.
    ///
    /// Returns the value back as `Err` if the sink is still full when the
    /// timeout expires. A zero timeout behaves like [`Sink::enqueue`].
    fn try_enqueue(&self, value: T, timeout: Duration) -> Result<(), T>;
}

/// The consumer side of a queue.
pub trait Source<T> {
    /// Take one value, blocking up to `timeout` for data.
    ///
    /// Returns `None` if the source is still empty when the timeout expires.
    /// A zero timeout polls once.
    fn dequeue(&self, timeout: Duration) -> Option<T>;

    /// Attach the observer this source must keep in sync with its
    /// "has unread data" condition. The current condition is published to
    /// the monitor before this call returns.
    fn set_status_monitor(&self, monitor: Arc<StatusMonitor>);
}

/// A queue observable through a [`StatusMonitor`].
///
/// Contract shared by every implementation: each successful mutation that
/// changes "is empty" publishes the new status to the attached monitor
/// synchronously, before the mutating call returns.
pub trait ObservedQueue<T>: Sink<T> + Source<T> {
    fn is_empty(&self) -> bool;

    fn len(&self) -> usize;

    /// Drop all queued values and report the queue empty.
    fn clear(&self);
}
