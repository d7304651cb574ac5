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

//! The three [`ObservedQueue`] implementations.
//!
//! - [`BasicObservedQueue`]: unsynchronized, single-threaded.
//! - [`BlockingObservedQueue`]: bounded capacity, blocking enqueue/dequeue
//!   with timeouts.
//! - [`SyncObservedQueue`]: thread-safe and unbounded; enqueue never blocks,
//!   dequeue waits up to a timeout.
//!
//! All three publish occupancy changes to their [`StatusMonitor`] while the
//! internal state is still locked (or, for the basic queue, before the call
//! returns), so a waiter never observes a stale status after a mutation
//! completed.

use std::{
    cell::RefCell,
    collections::VecDeque,
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};

use crate::{
    source::{ObservedQueue, Sink, Source},
    status::{Status, StatusMonitor},
};

fn publish(monitor: Option<&Arc<StatusMonitor>>, empty: bool) {
    if let Some(monitor) = monitor {
        let status = if empty {
            Status::Unavailable
        } else {
            Status::Available
        };
        monitor.set_status(status);
    }
}

/// An unsynchronized observed queue for single-threaded use.
///
/// No locking; interior mutability only. Because no other thread can refill
/// the queue while a caller waits, any dequeue timeout degenerates to an
/// immediate poll.
pub struct BasicObservedQueue<T> {
    items:   RefCell<VecDeque<T>>,
    monitor: RefCell<Option<Arc<StatusMonitor>>>,
}

impl<T> BasicObservedQueue<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            items:   RefCell::new(VecDeque::new()),
            monitor: RefCell::new(None),
        }
    }
}

impl<T> Default for BasicObservedQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Sink<T> for BasicObservedQueue<T> {
    fn enqueue(&self, value: T) -> Result<(), T> {
        self.items.borrow_mut().push_back(value);
        publish(self.monitor.borrow().as_ref(), false);
        Ok(())
    }

    fn try_enqueue(&self, value: T, _timeout: Duration) -> Result<(), T> {
        self.enqueue(value)
    }
}

impl<T> Source<T> for BasicObservedQueue<T> {
    fn dequeue(&self, _timeout: Duration) -> Option<T> {
        let value = self.items.borrow_mut().pop_front();
        if value.is_some() {
            publish(self.monitor.borrow().as_ref(), self.items.borrow().is_empty());
        }
        value
    }

    fn set_status_monitor(&self, monitor: Arc<StatusMonitor>) {
        let empty = self.items.borrow().is_empty();
        publish(Some(&monitor), empty);
        *self.monitor.borrow_mut() = Some(monitor);
    }
}

impl<T> ObservedQueue<T> for BasicObservedQueue<T> {
    fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    fn len(&self) -> usize {
        self.items.borrow().len()
    }

    fn clear(&self) {
        self.items.borrow_mut().clear();
        publish(self.monitor.borrow().as_ref(), true);
    }
}

struct Guarded<T> {
    items:   VecDeque<T>,
    monitor: Option<Arc<StatusMonitor>>,
}

impl<T> Guarded<T> {
    /// Publish occupancy while the queue lock is held, so two interleaved
    /// mutations cannot publish out of order.
    fn publish(&self) {
        publish(self.monitor.as_ref(), self.items.is_empty());
    }
}

/// A bounded, blocking observed queue.
///
/// `enqueue` rejects immediately when the queue is full; `try_enqueue`
/// blocks up to its timeout for space; `dequeue` blocks up to its timeout
/// for an item.
pub struct BlockingObservedQueue<T> {
    capacity:  usize,
    inner:     Mutex<Guarded<T>>,
    not_empty: Condvar,
    not_full:  Condvar,
}

impl<T> BlockingObservedQueue<T> {
    /// Create a queue holding at most `capacity` items.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be non-zero");
        Self {
            capacity,
            inner: Mutex::new(Guarded {
                items:   VecDeque::with_capacity(capacity),
                monitor: None,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }
}

impl<T> Sink<T> for BlockingObservedQueue<T> {
    fn enqueue(&self, value: T) -> Result<(), T> {
        let mut inner = self.inner.lock();
        if inner.items.len() >= self.capacity {
            return Err(value);
        }
        inner.items.push_back(value);
        inner.publish();
        self.not_empty.notify_one();
        Ok(())
    }

    fn try_enqueue(&self, value: T, timeout: Duration) -> Result<(), T> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();
        while inner.items.len() >= self.capacity {
            let now = Instant::now();
            if now >= deadline {
                return Err(value);
            }
            self.not_full.wait_for(&mut inner, deadline - now);
        }
        inner.items.push_back(value);
        inner.publish();
        self.not_empty.notify_one();
        Ok(())
    }
}

impl<T> Source<T> for BlockingObservedQueue<T> {
    fn dequeue(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();
        loop {
            if let Some(value) = inner.items.pop_front() {
                inner.publish();
                self.not_full.notify_one();
                return Some(value);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            self.not_empty.wait_for(&mut inner, deadline - now);
        }
    }

    fn set_status_monitor(&self, monitor: Arc<StatusMonitor>) {
        let mut inner = self.inner.lock();
        publish(Some(&monitor), inner.items.is_empty());
        inner.monitor = Some(monitor);
    }
}

impl<T> ObservedQueue<T> for BlockingObservedQueue<T> {
    fn is_empty(&self) -> bool {
        self.inner.lock().items.is_empty()
    }

    fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.items.clear();
        inner.publish();
        self.not_full.notify_all();
    }
}

/// A thread-safe, unbounded observed queue.
///
/// `enqueue` never blocks or fails for capacity reasons; `dequeue` blocks up
/// to its timeout.
pub struct SyncObservedQueue<T> {
    inner:     Mutex<Guarded<T>>,
    not_empty: Condvar,
}

impl<T> SyncObservedQueue<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner:     Mutex::new(Guarded {
                items:   VecDeque::new(),
                monitor: None,
            }),
            not_empty: Condvar::new(),
        }
    }
}

impl<T> Default for SyncObservedQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Sink<T> for SyncObservedQueue<T> {
    fn enqueue(&self, value: T) -> Result<(), T> {
        let mut inner = self.inner.lock();
        inner.items.push_back(value);
        inner.publish();
        self.not_empty.notify_one();
        Ok(())
    }

    fn try_enqueue(&self, value: T, _timeout: Duration) -> Result<(), T> {
        self.enqueue(value)
    }
}

impl<T> Source<T> for SyncObservedQueue<T> {
    fn dequeue(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();
        loop {
            if let Some(value) = inner.items.pop_front() {
                inner.publish();
                return Some(value);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            self.not_empty.wait_for(&mut inner, deadline - now);
        }
    }

    fn set_status_monitor(&self, monitor: Arc<StatusMonitor>) {
        let mut inner = self.inner.lock();
        publish(Some(&monitor), inner.items.is_empty());
        inner.monitor = Some(monitor);
    }
}

impl<T> ObservedQueue<T> for SyncObservedQueue<T> {
    fn is_empty(&self) -> bool {
        self.inner.lock().items.is_empty()
    }

    fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.items.clear();
        inner.publish();
    }
}
