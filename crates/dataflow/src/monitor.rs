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

//! Priority-multiplexed dequeue over many observed sources.
//!
//! [`QueueMonitor`] registers N prioritized [`Source`]s. On
//! [`dequeue`](QueueMonitor::dequeue) it scans them in priority order,
//! pulling from the first one whose [`StatusMonitor`] reports data; when no
//! source reports anything it parks on a shared [`StatusGroup`] for the
//! remaining timeout budget instead of polling queue contents.
//!
//! A lower-priority source is never drained while a higher-priority source
//! reports available data. Selection is not re-validated mid-call: a source
//! that becomes available while another is being pulled waits for the next
//! scan.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tracing::trace;

use crate::{
    error::{Result, TooManySourcesSnafu},
    source::Source,
    status::{MAX_GROUP_MONITORS, Status, StatusGroup, StatusMonitor},
};

/// Service tier of a registered source. Smaller tiers are drained first;
/// ties are broken by registration order, stably, on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum PriorityLevel {
    Highest,
    High,
    #[default]
    Medium,
    Low,
    Lowest,
}

/// Registration options for [`QueueMonitor::add_source`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PriorityOptions {
    pub level: PriorityLevel,
}

impl PriorityOptions {
    #[must_use]
    pub const fn new(level: PriorityLevel) -> Self {
        Self { level }
    }
}

struct PrioritizedSource<T> {
    source:   Arc<dyn Source<T>>,
    monitor:  Arc<StatusMonitor>,
    priority: PriorityLevel,
}

/// Drains the highest-priority source currently reporting data.
pub struct QueueMonitor<T> {
    /// Kept sorted by priority; stable within a tier (registration order).
    sources: Vec<PrioritizedSource<T>>,
    group:   Arc<StatusGroup>,
}

impl<T> QueueMonitor<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            group:   Arc::new(StatusGroup::new()),
        }
    }

    /// Register a prioritized source.
    ///
    /// A fresh [`StatusMonitor`] attached to this monitor's status group is
    /// handed to the source, so availability transitions wake a blocked
    /// [`dequeue`](Self::dequeue) without it polling queue contents.
    ///
    /// # Errors
    ///
    /// Fails when the status group is full
    /// ([`MAX_GROUP_MONITORS`] sources).
    pub fn add_source(&mut self, source: Arc<dyn Source<T>>, options: PriorityOptions) -> Result<()> {
        let monitor = Arc::new(StatusMonitor::new());
        snafu::ensure!(
            self.group.attach(&monitor),
            TooManySourcesSnafu {
                limit: MAX_GROUP_MONITORS,
            }
        );
        source.set_status_monitor(Arc::clone(&monitor));

        // Insert after every entry of equal or higher priority so equal
        // tiers keep registration order.
        let at = self
            .sources
            .partition_point(|entry| entry.priority <= options.level);
        self.sources.insert(at, PrioritizedSource {
            source,
            monitor,
            priority: options.level,
        });
        Ok(())
    }

    /// Take one value from the highest-priority source reporting data.
    ///
    /// If a selected source turns out to be empty (drained between the
    /// status check and the pull), the scan continues with the next
    /// candidate instead of failing. Returns `None` only once no source
    /// yields an item within the overall timeout budget; a zero timeout
    /// performs a single scan.
    pub fn dequeue(&self, timeout: Duration) -> Option<T> {
        let start = Instant::now();
        loop {
            for entry in &self.sources {
                if entry.monitor.status() != Status::Available {
                    continue;
                }
                if let Some(value) = entry.source.dequeue(Duration::ZERO) {
                    return Some(value);
                }
                // Raced with another consumer or a flapping source; try the
                // next candidate in priority order.
                trace!(priority = ?entry.priority, "source reported data but came up empty");
            }

            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return None;
            }
            self.group.wait_for_work(timeout - elapsed);
        }
    }

    /// Number of registered sources.
    #[must_use]
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }
}

impl<T> Default for QueueMonitor<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use parking_lot::Mutex;

    use super::*;
    use crate::queue::SyncObservedQueue;
    use crate::source::Sink;

    /// A scripted source: reports available while it still has replies, and
    /// can be told to lie about availability to exercise the race path.
    struct MockSource {
        replies: Mutex<Vec<Option<String>>>,
        monitor: Mutex<Option<Arc<StatusMonitor>>>,
    }

    impl MockSource {
        fn new(replies: Vec<Option<String>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies),
                monitor: Mutex::new(None),
            })
        }

        fn report_available(&self) {
            if let Some(monitor) = self.monitor.lock().as_ref() {
                monitor.set_status(Status::Available);
            }
        }
    }

    impl Source<String> for MockSource {
        fn dequeue(&self, _timeout: Duration) -> Option<String> {
            let mut replies = self.replies.lock();
            if replies.is_empty() {
                None
            } else {
                replies.remove(0)
            }
        }

        fn set_status_monitor(&self, monitor: Arc<StatusMonitor>) {
            *self.monitor.lock() = Some(monitor);
        }
    }

    #[test]
    fn test_single_source() {
        let source = MockSource::new(vec![Some("test_string".to_string())]);
        let mut queue_monitor = QueueMonitor::new();
        queue_monitor
            .add_source(source.clone(), PriorityOptions::default())
            .unwrap();
        source.report_available();

        let data = queue_monitor.dequeue(Duration::ZERO);
        assert_eq!(data.as_deref(), Some("test_string"));
    }

    #[test]
    fn test_high_priority_drained_first() {
        let mut queue_monitor = QueueMonitor::new();

        let low = MockSource::new(vec![Some("low_priority".to_string())]);
        queue_monitor
            .add_source(low.clone(), PriorityOptions::new(PriorityLevel::Lowest))
            .unwrap();

        let high = MockSource::new(vec![Some("high_priority".to_string())]);
        queue_monitor
            .add_source(high.clone(), PriorityOptions::new(PriorityLevel::Highest))
            .unwrap();

        low.report_available();
        high.report_available();

        assert_eq!(
            queue_monitor.dequeue(Duration::ZERO).as_deref(),
            Some("high_priority")
        );
        assert_eq!(
            queue_monitor.dequeue(Duration::ZERO).as_deref(),
            Some("low_priority")
        );
        assert!(queue_monitor.dequeue(Duration::ZERO).is_none());
    }

    #[test]
    fn test_equal_priority_ties_follow_registration_order() {
        let mut queue_monitor = QueueMonitor::new();

        let first = MockSource::new(vec![Some("first".to_string())]);
        let second = MockSource::new(vec![Some("second".to_string())]);
        queue_monitor
            .add_source(first.clone(), PriorityOptions::default())
            .unwrap();
        queue_monitor
            .add_source(second.clone(), PriorityOptions::default())
            .unwrap();

        first.report_available();
        second.report_available();

        assert_eq!(queue_monitor.dequeue(Duration::ZERO).as_deref(), Some("first"));
        assert_eq!(queue_monitor.dequeue(Duration::ZERO).as_deref(), Some("second"));
    }

    #[test]
    fn test_empty_candidate_does_not_fail_the_scan() {
        let mut queue_monitor = QueueMonitor::new();

        // Claims availability but yields nothing: the scan must move on.
        let liar = MockSource::new(vec![None]);
        queue_monitor
            .add_source(liar.clone(), PriorityOptions::new(PriorityLevel::Highest))
            .unwrap();

        let honest = MockSource::new(vec![Some("data".to_string())]);
        queue_monitor
            .add_source(honest.clone(), PriorityOptions::new(PriorityLevel::Lowest))
            .unwrap();

        liar.report_available();
        honest.report_available();

        assert_eq!(queue_monitor.dequeue(Duration::ZERO).as_deref(), Some("data"));
    }

    #[test]
    fn test_dequeue_times_out_when_no_source_reports() {
        let queue_monitor = QueueMonitor::<String>::new();
        let start = Instant::now();
        assert!(queue_monitor.dequeue(Duration::from_millis(30)).is_none());
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_dequeue_wakes_on_late_producer() {
        let queue = Arc::new(SyncObservedQueue::new());
        let mut queue_monitor = QueueMonitor::new();
        queue_monitor
            .add_source(queue.clone(), PriorityOptions::default())
            .unwrap();

        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                queue.enqueue("late".to_string()).is_ok()
            })
        };

        let value = queue_monitor.dequeue(Duration::from_secs(5));
        assert_eq!(value.as_deref(), Some("late"));
        assert!(producer.join().unwrap());
    }

    #[test]
    fn test_add_source_rejects_past_group_capacity() {
        let mut queue_monitor = QueueMonitor::new();
        for _ in 0..crate::status::MAX_GROUP_MONITORS {
            let source = MockSource::new(vec![]);
            queue_monitor
                .add_source(source, PriorityOptions::default())
                .unwrap();
        }
        let overflow = MockSource::new(vec![]);
        assert!(queue_monitor
            .add_source(overflow, PriorityOptions::default())
            .is_err());
    }
}
