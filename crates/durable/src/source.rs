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

//! Thread-safe [`Source`] adapter over a [`DurableLog`].
//!
//! The log itself is single-threaded (`&mut self` everywhere); this
//! adapter serializes access behind a mutex so producers can write while a
//! dispatch loop dequeues, and so the log can be registered with a
//! [`QueueMonitor`](spool_dataflow::QueueMonitor) like any in-memory queue.

use std::{sync::Arc, time::Duration};

use parking_lot::Mutex;
use spool_dataflow::{Source, StatusMonitor};
use tracing::warn;

use crate::{
    Result,
    log::{DataToken, DurableLog, StagedRead},
};

pub struct DurableSource {
    log: Mutex<DurableLog>,
}

impl DurableSource {
    pub fn new(log: DurableLog) -> Self {
        Self { log: Mutex::new(log) }
    }

    /// Append one record. See [`DurableLog::write`].
    pub fn write(&self, payload: &[u8]) -> Result<()> {
        self.log.lock().write(payload)
    }

    /// Report the outcome of a checked-out record. See
    /// [`DurableLog::resolve`].
    pub fn resolve(&self, token: DataToken, success: bool) -> Result<()> {
        self.log.lock().resolve(token, success)
    }

    pub fn is_data_available(&self) -> bool {
        self.log.lock().is_data_available()
    }
}

impl Source<StagedRead> for DurableSource {
    /// Poll the log once for the oldest unconsumed record.
    ///
    /// The timeout is ignored: disk-backed data is either present or not,
    /// and blocking for new writes is the job of the attached monitor.
    /// Read failures are logged and reported as "no data" so a corrupt
    /// segment cannot wedge a dispatch loop.
    fn dequeue(&self, _timeout: Duration) -> Option<StagedRead> {
        match self.log.lock().read() {
            Ok(staged) => staged,
            Err(error) => {
                warn!(error = %error, "failed to read from durable log");
                None
            }
        }
    }

    fn set_status_monitor(&self, monitor: Arc<StatusMonitor>) {
        self.log.lock().set_status_monitor(monitor);
    }
}

#[cfg(test)]
mod tests {
    use spool_dataflow::Status;
    use tempfile::TempDir;

    use super::*;
    use crate::DurableLogBuilder;

    fn open_source(dir: &TempDir) -> DurableSource {
        let log = DurableLogBuilder::new(dir.path()).build().unwrap();
        DurableSource::new(log)
    }

    #[test]
    fn test_dequeue_empty() {
        let dir = TempDir::new().unwrap();
        let source = open_source(&dir);
        assert!(source.dequeue(Duration::ZERO).is_none());
    }

    #[test]
    fn test_write_dequeue_resolve() {
        let dir = TempDir::new().unwrap();
        let source = open_source(&dir);

        source.write(b"payload").unwrap();
        assert!(source.is_data_available());

        let staged = source.dequeue(Duration::ZERO).unwrap();
        assert_eq!(staged.payload.as_ref(), b"payload");

        source.resolve(staged.token, true).unwrap();
        assert!(source.dequeue(Duration::ZERO).is_none());
    }

    #[test]
    fn test_failed_resolve_redelivers_through_adapter() {
        let dir = TempDir::new().unwrap();
        let source = open_source(&dir);

        source.write(b"sticky").unwrap();
        let staged = source.dequeue(Duration::ZERO).unwrap();
        source.resolve(staged.token, false).unwrap();

        let again = source.dequeue(Duration::ZERO).unwrap();
        assert_eq!(again.payload.as_ref(), b"sticky");
    }

    #[test]
    fn test_monitor_attach_publishes_current_state() {
        let dir = TempDir::new().unwrap();
        let source = open_source(&dir);
        source.write(b"waiting").unwrap();

        let monitor = Arc::new(StatusMonitor::new());
        source.set_status_monitor(Arc::clone(&monitor));
        assert_eq!(monitor.status(), Status::Available);
    }
}
