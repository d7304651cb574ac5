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

//! Segmented durable log with at-least-once read semantics.
//!
//! Records are appended to an active segment file; when it reaches the
//! configured size it is sealed and a fresh active segment is opened.
//! Reads drain the oldest data first: a [`read`](DurableLog::read) checks
//! one record out and hands back a [`DataToken`]; the caller reports the
//! outcome with [`resolve`](DurableLog::resolve). Until a successful
//! resolve, the same record is redelivered, so a crash between read and
//! resolve loses nothing.
//!
//! The log never exceeds its storage quota: when total bytes pass
//! `storage_limit`, the oldest sealed segments are deleted. Dropping
//! unread data is preferred over unbounded disk growth.

use std::{
    collections::VecDeque,
    fs::{self, File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};

use bytes::Bytes;
use snafu::{ResultExt, ensure};
use spool_dataflow::{Status, StatusMonitor};
use tracing::{debug, info, warn};

use crate::{
    config::DurableLogConfig,
    error::{IoSnafu, Result, StaleTokenSnafu},
    frame,
    path::expand_home_from_env,
    segment::{self, SegmentMeta},
};

/// Receipt for one checked-out record.
///
/// Returned by [`DurableLog::read`] and consumed by
/// [`DurableLog::resolve`]. Tokens are unique per log instance; a token
/// from a previous checkout is rejected as stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataToken(pub(crate) u64);

/// One record staged for consumption.
#[derive(Debug, Clone)]
pub struct StagedRead {
    pub payload: Bytes,
    pub token:   DataToken,
}

/// Position of the next record to hand out.
#[derive(Debug, Clone, Copy)]
struct ReadCursor {
    sequence: u64,
    offset:   u64,
}

/// Read-side state machine. At most one record is checked out at a time.
#[derive(Debug, Clone, Copy)]
enum ReadState {
    Idle,
    CheckedOut {
        token:    u64,
        sequence: u64,
        start:    u64,
        end:      u64,
    },
}

/// A crash-tolerant, size-bounded record log backed by segment files.
///
/// One instance owns its folder exclusively. All methods take `&mut self`;
/// wrap the log in [`DurableSource`](crate::DurableSource) to share it
/// across threads.
pub struct DurableLog {
    config:      DurableLogConfig,
    /// Sealed segments, oldest first. The cursor segment is always the
    /// front of this deque, or the active segment once it is drained.
    sealed:      VecDeque<SegmentMeta>,
    active:      SegmentMeta,
    active_file: File,
    cursor:      ReadCursor,
    read_state:  ReadState,
    next_token:  u64,
    monitor:     Option<Arc<StatusMonitor>>,
}

impl DurableLog {
    /// Open the log, adopting whatever a previous instance left behind.
    ///
    /// The folder is created if missing. The highest-sequence segment
    /// becomes the active write target and has any torn tail truncated
    /// away; every other matching file becomes a sealed read candidate.
    /// Recovery granularity is whole segments: consumed-but-unresolved
    /// offsets are not persisted, so records from a partially read
    /// segment are delivered again.
    pub(crate) fn open(mut config: DurableLogConfig) -> Result<Self> {
        if let Some(raw) = config.folder.to_str()
            && raw.starts_with('~')
        {
            config.folder = PathBuf::from(expand_home_from_env(raw)?);
        }
        fs::create_dir_all(&config.folder).context(IoSnafu { path: &config.folder })?;

        let mut segments = segment::scan_segments(&config)?;
        let active = match segments.pop() {
            Some(mut last) => {
                let valid = frame::valid_prefix_len(&last.path, last.sequence)?;
                if valid < last.size {
                    warn!(
                        path = ?last.path,
                        from = last.size,
                        to = valid,
                        "truncating torn tail of active segment"
                    );
                    let file = OpenOptions::new()
                        .write(true)
                        .open(&last.path)
                        .context(IoSnafu { path: &last.path })?;
                    file.set_len(valid).context(IoSnafu { path: &last.path })?;
                    last.size = valid;
                }
                last
            }
            None => Self::create_segment(&config, 0)?,
        };
        let active_file = OpenOptions::new()
            .append(true)
            .open(&active.path)
            .context(IoSnafu { path: &active.path })?;

        let sealed: VecDeque<SegmentMeta> = segments.into();
        let cursor = ReadCursor {
            sequence: sealed.front().map_or(active.sequence, |s| s.sequence),
            offset:   0,
        };
        info!(
            folder = ?config.folder,
            sealed = sealed.len(),
            active_sequence = active.sequence,
            "opened durable log"
        );

        Ok(Self {
            config,
            sealed,
            active,
            active_file,
            cursor,
            read_state: ReadState::Idle,
            next_token: 1,
            monitor: None,
        })
    }

    /// Append one record.
    ///
    /// The record always lands in the current active segment, even when it
    /// pushes the segment past `max_file_size`; rotation and quota
    /// enforcement run after the append. A payload too large for the
    /// frame's u32 length prefix is rejected with `RecordTooLarge` before
    /// anything touches disk.
    pub fn write(&mut self, payload: &[u8]) -> Result<()> {
        let encoded = frame::encode_frame(payload)?;
        self.active_file
            .write_all(&encoded)
            .context(IoSnafu { path: &self.active.path })?;
        self.active.size += encoded.len() as u64;
        debug!(
            bytes = payload.len(),
            segment = self.active.sequence,
            "appended record"
        );

        if self.active.size >= self.config.max_file_size {
            self.rotate()?;
        }
        let evicted = self.enforce_storage_limit();
        self.publish_availability();
        evicted
    }

    /// Check out the oldest unconsumed record, if any.
    ///
    /// The cursor does not advance: until the returned token is resolved
    /// successfully, every call returns the same record. Calling again
    /// while a record is checked out re-returns that record with its
    /// original token.
    pub fn read(&mut self) -> Result<Option<StagedRead>> {
        if let ReadState::CheckedOut { token, sequence, start, .. } = self.read_state {
            if let Some(path) = self.segment_for(sequence).map(|s| s.path.clone()) {
                return match frame::read_frame_at(&path, sequence, start)? {
                    Some(decoded) => Ok(Some(StagedRead {
                        payload: decoded.payload,
                        token:   DataToken(token),
                    })),
                    None => {
                        warn!(sequence, start, "checked-out record vanished from segment");
                        self.read_state = ReadState::Idle;
                        Ok(None)
                    }
                };
            }
            self.read_state = ReadState::Idle;
        }

        loop {
            let (sequence, path, is_active) = {
                let current = self.cursor_segment();
                (
                    current.sequence,
                    current.path.clone(),
                    current.sequence == self.active.sequence,
                )
            };
            match frame::read_frame_at(&path, sequence, self.cursor.offset)? {
                Some(decoded) => {
                    let token = self.next_token;
                    self.next_token += 1;
                    self.read_state = ReadState::CheckedOut {
                        token,
                        sequence,
                        start: self.cursor.offset,
                        end: self.cursor.offset + decoded.disk_size,
                    };
                    debug!(token, sequence, offset = self.cursor.offset, "record checked out");
                    self.publish_availability();
                    return Ok(Some(StagedRead {
                        payload: decoded.payload,
                        token:   DataToken(token),
                    }));
                }
                None if is_active => {
                    self.publish_availability();
                    return Ok(None);
                }
                // A sealed segment with nothing left at the cursor is done
                // with; drop it and move to the next one.
                None => self.drop_front_sealed()?,
            }
        }
    }

    /// Report the outcome of a checked-out record.
    ///
    /// On success the cursor advances past the record; a sealed segment
    /// whose last record was just consumed is deleted. On failure the
    /// cursor stays put and the next [`read`](Self::read) redelivers the
    /// same record under a fresh checkout. Either way the token is spent.
    pub fn resolve(&mut self, token: DataToken, success: bool) -> Result<()> {
        let ReadState::CheckedOut { token: outstanding, end, .. } = self.read_state else {
            return StaleTokenSnafu { token: token.0 }.fail();
        };
        ensure!(outstanding == token.0, StaleTokenSnafu { token: token.0 });

        self.read_state = ReadState::Idle;
        if success {
            self.cursor.offset = end;
            debug!(token = token.0, "record resolved");
            let advanced = self.advance_past_drained_segment();
            self.publish_availability();
            advanced?;
        } else {
            debug!(token = token.0, "record resolution failed, staged for redelivery");
            self.publish_availability();
        }
        Ok(())
    }

    /// Whether an unconsumed record exists past the current read position.
    ///
    /// While a record is checked out, the position is the end of that
    /// record: the last record of the log reads as unavailable until its
    /// resolution fails.
    pub fn is_data_available(&self) -> bool {
        let (sequence, offset) = match self.read_state {
            ReadState::CheckedOut { sequence, end, .. } => (sequence, end),
            ReadState::Idle => (self.cursor.sequence, self.cursor.offset),
        };
        if sequence == self.active.sequence {
            return self.active.size > offset;
        }
        let mut later_data = false;
        for segment in &self.sealed {
            if segment.sequence == sequence && segment.size > offset {
                return true;
            }
            if segment.sequence > sequence && segment.size > 0 {
                later_data = true;
            }
        }
        later_data || self.active.size > 0
    }

    /// Register the monitor that availability changes are published to.
    pub fn set_status_monitor(&mut self, monitor: Arc<StatusMonitor>) {
        monitor.set_status(if self.is_data_available() {
            Status::Available
        } else {
            Status::Unavailable
        });
        self.monitor = Some(monitor);
    }

    /// Path of the segment the next read will come from.
    pub fn file_to_read(&self) -> &Path {
        &self.cursor_segment().path
    }

    /// Path of the segment writes currently go to.
    pub fn active_write_file(&self) -> &Path {
        &self.active.path
    }

    pub fn config(&self) -> &DurableLogConfig {
        &self.config
    }

    /// Total bytes currently held across all segment files.
    pub fn disk_usage(&self) -> u64 {
        self.active.size + self.sealed.iter().map(|s| s.size).sum::<u64>()
    }

    fn create_segment(config: &DurableLogConfig, sequence: u64) -> Result<SegmentMeta> {
        let path = segment::segment_path(config, sequence);
        File::create(&path).context(IoSnafu { path: &path })?;
        debug!(path = ?path, sequence, "created segment");
        Ok(SegmentMeta { sequence, path, size: 0 })
    }

    /// Seal the active segment and open an empty successor.
    fn rotate(&mut self) -> Result<()> {
        let next = Self::create_segment(&self.config, self.active.sequence + 1)?;
        let file = OpenOptions::new()
            .append(true)
            .open(&next.path)
            .context(IoSnafu { path: &next.path })?;
        let sealed = std::mem::replace(&mut self.active, next);
        self.active_file = file;
        info!(
            sealed = sealed.sequence,
            active = self.active.sequence,
            "rotated active segment"
        );
        self.sealed.push_back(sealed);
        Ok(())
    }

    /// Delete oldest sealed segments until total size is back under the
    /// quota. The active segment is never deleted, so a single oversized
    /// record can still exceed the limit transiently.
    fn enforce_storage_limit(&mut self) -> Result<()> {
        while self.disk_usage() > self.config.storage_limit {
            let Some(victim) = self.sealed.pop_front() else {
                break;
            };
            if let Err(source) = fs::remove_file(&victim.path) {
                warn!(path = ?victim.path, error = %source, "failed to evict segment");
                let path = victim.path.clone();
                self.sealed.push_front(victim);
                return Err(source).context(IoSnafu { path });
            }
            warn!(
                path = ?victim.path,
                size = victim.size,
                "evicted oldest segment to honor storage limit"
            );
            if self.cursor.sequence == victim.sequence {
                if let ReadState::CheckedOut { token, .. } = self.read_state {
                    warn!(token, "outstanding checkout invalidated by eviction");
                    self.read_state = ReadState::Idle;
                }
                self.cursor = ReadCursor {
                    sequence: self.oldest_sequence(),
                    offset:   0,
                };
            }
        }
        Ok(())
    }

    /// If the cursor sits at the end of a sealed segment, delete it and
    /// move to the next one.
    fn advance_past_drained_segment(&mut self) -> Result<()> {
        let drained = self
            .sealed
            .front()
            .is_some_and(|s| s.sequence == self.cursor.sequence && self.cursor.offset >= s.size);
        if drained {
            self.drop_front_sealed()?;
        }
        Ok(())
    }

    fn drop_front_sealed(&mut self) -> Result<()> {
        let Some(victim) = self.sealed.pop_front() else {
            return Ok(());
        };
        if let Err(source) = fs::remove_file(&victim.path) {
            warn!(path = ?victim.path, error = %source, "failed to remove drained segment");
            let path = victim.path.clone();
            self.sealed.push_front(victim);
            return Err(source).context(IoSnafu { path });
        }
        debug!(path = ?victim.path, "removed drained segment");
        self.cursor = ReadCursor {
            sequence: self.oldest_sequence(),
            offset:   0,
        };
        Ok(())
    }

    fn oldest_sequence(&self) -> u64 {
        self.sealed.front().map_or(self.active.sequence, |s| s.sequence)
    }

    fn cursor_segment(&self) -> &SegmentMeta {
        self.sealed
            .front()
            .filter(|s| s.sequence == self.cursor.sequence)
            .unwrap_or(&self.active)
    }

    fn segment_for(&self, sequence: u64) -> Option<&SegmentMeta> {
        if sequence == self.active.sequence {
            return Some(&self.active);
        }
        self.sealed.iter().find(|s| s.sequence == sequence)
    }

    fn publish_availability(&self) {
        if let Some(monitor) = &self.monitor {
            monitor.set_status(if self.is_data_available() {
                Status::Available
            } else {
                Status::Unavailable
            });
        }
    }
}
