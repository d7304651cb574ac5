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

//! On-disk frame format.
//!
//! Each record is stored as one self-delimiting frame:
//!
//! ```text
//! ┌─────────────────┬──────────────────────┬─────────────────┐
//! │  Length (4B)    │   Payload (variable) │   CRC32 (4B)    │
//! │  little-endian  │   raw bytes          │   little-endian │
//! └─────────────────┴──────────────────────┴─────────────────┘
//! ```
//!
//! The CRC covers length prefix and payload, so both corruption and a
//! torn length field are detected. A frame cut short by a crash is treated
//! as end-of-data, not as corruption.

use std::{
    fs::File,
    io::{Read, Seek, SeekFrom},
    path::Path,
};

use bytes::Bytes;
use crc32fast::Hasher;
use snafu::{OptionExt, ResultExt, ensure};
use tracing::warn;

use crate::error::{CorruptedFrameSnafu, IoSnafu, RecordTooLargeSnafu, Result};

/// Size of the length prefix in bytes.
pub(crate) const FRAME_LENGTH_SIZE: usize = 4;

/// Size of the CRC32 checksum in bytes.
pub(crate) const FRAME_CRC_SIZE: usize = 4;

/// Total on-disk size of a frame for a given payload length.
#[inline]
pub(crate) const fn frame_disk_size(payload_len: usize) -> usize {
    FRAME_LENGTH_SIZE + payload_len + FRAME_CRC_SIZE
}

#[inline]
pub(crate) fn calculate_frame_crc(length: u32, payload: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(&length.to_le_bytes());
    hasher.update(payload);
    hasher.finalize()
}

#[inline]
pub(crate) fn verify_frame_crc(length: u32, payload: &[u8], expected: u32) -> bool {
    calculate_frame_crc(length, payload) == expected
}

/// Length prefix for a payload of `payload_len` bytes.
pub(crate) fn frame_length(payload_len: usize) -> Result<u32> {
    u32::try_from(payload_len)
        .ok()
        .context(RecordTooLargeSnafu { size: payload_len })
}

/// Encode one payload into its on-disk frame.
pub(crate) fn encode_frame(payload: &[u8]) -> Result<Vec<u8>> {
    let length = frame_length(payload.len())?;
    let mut buf = Vec::with_capacity(frame_disk_size(payload.len()));
    buf.extend_from_slice(&length.to_le_bytes());
    buf.extend_from_slice(payload);
    buf.extend_from_slice(&calculate_frame_crc(length, payload).to_le_bytes());
    Ok(buf)
}

/// A frame decoded from a segment file.
pub(crate) struct DecodedFrame {
    pub payload:   Bytes,
    /// Bytes the frame occupies on disk, header and checksum included.
    pub disk_size: u64,
}

/// Decode the frame starting at `offset` in the segment at `path`.
///
/// Returns `Ok(None)` when no complete frame lies at the offset (end of
/// data, or a tail torn by a crash). A checksum mismatch on a complete
/// frame is corruption and yields an error; `sequence` is only used for
/// error context.
pub(crate) fn read_frame_at(path: &Path, sequence: u64, offset: u64) -> Result<Option<DecodedFrame>> {
    let mut file = File::open(path).context(IoSnafu { path })?;
    let file_size = file.metadata().context(IoSnafu { path })?.len();

    if offset + FRAME_LENGTH_SIZE as u64 > file_size {
        return Ok(None);
    }

    file.seek(SeekFrom::Start(offset)).context(IoSnafu { path })?;
    let mut length_buf = [0u8; FRAME_LENGTH_SIZE];
    file.read_exact(&mut length_buf).context(IoSnafu { path })?;
    let length = u32::from_le_bytes(length_buf);

    let total = frame_disk_size(length as usize) as u64;
    if offset + total > file_size {
        warn!(
            path = ?path,
            offset,
            length,
            file_size,
            "truncated frame at end of segment"
        );
        return Ok(None);
    }

    let mut payload = vec![0u8; length as usize];
    file.read_exact(&mut payload).context(IoSnafu { path })?;

    let mut crc_buf = [0u8; FRAME_CRC_SIZE];
    file.read_exact(&mut crc_buf).context(IoSnafu { path })?;
    let stored_crc = u32::from_le_bytes(crc_buf);

    ensure!(
        verify_frame_crc(length, &payload, stored_crc),
        CorruptedFrameSnafu { sequence, offset }
    );

    Ok(Some(DecodedFrame {
        payload:   Bytes::from(payload),
        disk_size: total,
    }))
}

/// Walk the frames of a segment from the start and return the byte length
/// of the valid prefix.
///
/// Stops at the first incomplete or corrupt frame; everything before it is
/// intact. Used at open time to drop a torn tail before appending again.
pub(crate) fn valid_prefix_len(path: &Path, sequence: u64) -> Result<u64> {
    let mut position = 0u64;
    loop {
        match read_frame_at(path, sequence, position) {
            Ok(Some(frame)) => position += frame.disk_size,
            Ok(None) => return Ok(position),
            Err(error) => {
                warn!(
                    path = ?path,
                    position,
                    error = %error,
                    "stopping segment scan at corrupt frame"
                );
                return Ok(position);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_frames(path: &Path, payloads: &[&[u8]]) {
        let mut file = File::create(path).unwrap();
        for payload in payloads {
            file.write_all(&encode_frame(payload).unwrap()).unwrap();
        }
    }

    #[test]
    fn test_frame_disk_size() {
        assert_eq!(frame_disk_size(0), 8);
        assert_eq!(frame_disk_size(10), 18);
        assert_eq!(frame_disk_size(100), 108);
    }

    #[test]
    fn test_frame_length_rejects_oversized_payload() {
        assert_eq!(frame_length(0).unwrap(), 0);
        assert_eq!(frame_length(4096).unwrap(), 4096);
        assert!(matches!(
            frame_length(usize::MAX),
            Err(crate::DurableLogError::RecordTooLarge { .. })
        ));
    }

    #[test]
    fn test_crc_detects_changes() {
        let payload = b"frame payload";
        let length = payload.len() as u32;
        let crc = calculate_frame_crc(length, payload);

        assert!(verify_frame_crc(length, payload, crc));
        assert!(!verify_frame_crc(length, payload, crc.wrapping_add(1)));
        assert!(!verify_frame_crc(length + 1, payload, crc));
        assert!(!verify_frame_crc(length, b"other payload", crc));
    }

    #[test]
    fn test_encode_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seg");
        write_frames(&path, &[b"first", b"second"]);

        let first = read_frame_at(&path, 0, 0).unwrap().unwrap();
        assert_eq!(first.payload.as_ref(), b"first");

        let second = read_frame_at(&path, 0, first.disk_size).unwrap().unwrap();
        assert_eq!(second.payload.as_ref(), b"second");

        let end = first.disk_size + second.disk_size;
        assert!(read_frame_at(&path, 0, end).unwrap().is_none());
    }

    #[test]
    fn test_empty_payload_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seg");
        write_frames(&path, &[b""]);

        let frame = read_frame_at(&path, 0, 0).unwrap().unwrap();
        assert!(frame.payload.is_empty());
        assert_eq!(frame.disk_size, 8);
    }

    #[test]
    fn test_truncated_tail_is_end_of_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seg");

        let mut bytes = encode_frame(b"whole frame").unwrap();
        bytes.extend_from_slice(&100u32.to_le_bytes());
        bytes.extend_from_slice(b"only part of the promised payload");
        std::fs::write(&path, &bytes).unwrap();

        let frame = read_frame_at(&path, 0, 0).unwrap().unwrap();
        assert_eq!(frame.payload.as_ref(), b"whole frame");
        assert!(read_frame_at(&path, 0, frame.disk_size).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_crc_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seg");

        let mut bytes = encode_frame(b"doomed").unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        std::fs::write(&path, &bytes).unwrap();

        assert!(read_frame_at(&path, 3, 0).is_err());
    }

    #[test]
    fn test_valid_prefix_len_stops_at_torn_tail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seg");

        let good = encode_frame(b"good").unwrap();
        let mut bytes = good.clone();
        bytes.extend_from_slice(&50u32.to_le_bytes());
        bytes.extend_from_slice(b"torn");
        std::fs::write(&path, &bytes).unwrap();

        assert_eq!(valid_prefix_len(&path, 0).unwrap(), good.len() as u64);
    }

    #[test]
    fn test_valid_prefix_len_stops_at_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seg");

        let good = encode_frame(b"good").unwrap();
        let mut bad = encode_frame(b"bad").unwrap();
        let last = bad.len() - 1;
        bad[last] ^= 0xFF;

        let mut bytes = good.clone();
        bytes.extend_from_slice(&bad);
        bytes.extend_from_slice(&encode_frame(b"unreachable").unwrap());
        std::fs::write(&path, &bytes).unwrap();

        assert_eq!(valid_prefix_len(&path, 0).unwrap(), good.len() as u64);
    }
}
