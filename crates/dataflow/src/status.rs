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

//! Observable availability flags.
//!
//! A [`StatusMonitor`] is the non-polling "has data" signal shared between a
//! data source and its consumer: the source calls
//! [`set_status`](StatusMonitor::set_status) whenever its unread-data
//! condition changes, and the consumer either polls
//! [`status`](StatusMonitor::status) or blocks in
//! [`wait_for_available`](StatusMonitor::wait_for_available).
//!
//! A [`StatusGroup`] aggregates up to [`MAX_GROUP_MONITORS`] monitors behind
//! one condition variable so a single consumer can sleep until *any* of its
//! sources becomes available. Each attached monitor owns one bit of the
//! group's mask; the group reports work whenever the mask is non-zero.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};

/// Maximum number of monitors one [`StatusGroup`] can aggregate (mask width).
pub const MAX_GROUP_MONITORS: usize = 64;

/// Availability of a data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    /// The source holds unread data.
    Available,
    /// The source has nothing to read.
    #[default]
    Unavailable,
}

struct MonitorState {
    status: Status,
    /// Group membership, set once when attached via [`StatusGroup::attach`].
    group:  Option<(Arc<StatusGroup>, u8)>,
}

/// An observable two-state availability flag.
///
/// Thread-safe under concurrent readers and writers. The initial state is
/// [`Status::Unavailable`]. Waiters are notified only on state transitions;
/// setting the current state again is a no-op.
pub struct StatusMonitor {
    state: Mutex<MonitorState>,
    cond:  Condvar,
}

impl StatusMonitor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MonitorState {
                status: Status::Unavailable,
                group:  None,
            }),
            cond:  Condvar::new(),
        }
    }

    /// Update the flag, waking waiters when the state actually changes.
    ///
    /// If the monitor is attached to a [`StatusGroup`], the group's mask bit
    /// is updated before this call returns, so a consumer sleeping on the
    /// group observes the transition.
    pub fn set_status(&self, status: Status) {
        let mut state = self.state.lock();
        if state.status == status {
            return;
        }
        state.status = status;
        self.cond.notify_all();

        if let Some((group, bit)) = state.group.clone() {
            group.set(bit, status == Status::Available);
        }
    }

    /// Current state of the flag.
    #[must_use]
    pub fn status(&self) -> Status {
        self.state.lock().status
    }

    /// Block until the monitor reports [`Status::Available`] or the timeout
    /// elapses. A zero timeout polls once. Returns true iff the monitor is
    /// available at return.
    pub fn wait_for_available(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            if state.status == Status::Available {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            self.cond.wait_for(&mut state, deadline - now);
        }
    }
}

impl Default for StatusMonitor {
    fn default() -> Self {
        Self::new()
    }
}

struct GroupState {
    /// One bit per attached monitor; bit set = that monitor is available.
    mask:     u64,
    attached: u8,
}

/// Aggregates many [`StatusMonitor`]s behind one condition variable.
pub struct StatusGroup {
    state: Mutex<GroupState>,
    cond:  Condvar,
}

impl StatusGroup {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GroupState {
                mask:     0,
                attached: 0,
            }),
            cond:  Condvar::new(),
        }
    }

    /// Attach a monitor to this group, assigning it the next mask bit.
    ///
    /// The monitor's current state is propagated into the mask immediately.
    /// Returns false when the group is full ([`MAX_GROUP_MONITORS`]).
    pub fn attach(self: &Arc<Self>, monitor: &StatusMonitor) -> bool {
        let bit = {
            let mut group = self.state.lock();
            if usize::from(group.attached) >= MAX_GROUP_MONITORS {
                return false;
            }
            group.attached += 1;
            group.attached - 1
        };

        let available = {
            let mut state = monitor.state.lock();
            state.group = Some((Arc::clone(self), bit));
            state.status == Status::Available
        };
        self.set(bit, available);
        true
    }

    /// Block until any attached monitor is available or the timeout elapses.
    /// A zero timeout polls once. Returns true iff work is available.
    pub fn wait_for_work(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            if state.mask != 0 {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            self.cond.wait_for(&mut state, deadline - now);
        }
    }

    fn set(&self, bit: u8, available: bool) {
        let mut state = self.state.lock();
        if available {
            state.mask |= 1 << bit;
            self.cond.notify_all();
        } else {
            state.mask &= !(1 << bit);
        }
    }
}

impl Default for StatusGroup {
    fn default() -> Self {
        Self::new()
    }
}
