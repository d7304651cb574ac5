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

//! Segment file naming and folder scanning.
//!
//! Each segment file is named `<prefix><sequence><extension>` with the
//! sequence number zero-padded to a fixed width, so lexicographic order of
//! file names equals numeric order of sequences.

use std::{
    fs,
    path::{Path, PathBuf},
};

use snafu::ResultExt;
use tracing::warn;

use crate::{
    config::DurableLogConfig,
    error::{IoSnafu, Result},
};

/// Zero-pad width of the sequence number in file names.
const SEQUENCE_WIDTH: usize = 10;

/// A segment file known to the log.
#[derive(Debug, Clone)]
pub(crate) struct SegmentMeta {
    pub sequence: u64,
    pub path:     PathBuf,
    /// On-disk size in bytes, tracked so quota checks need no stat calls.
    pub size:     u64,
}

/// File name of the segment with the given sequence number.
pub(crate) fn segment_file_name(config: &DurableLogConfig, sequence: u64) -> String {
    format!(
        "{}{:0width$}{}",
        config.file_prefix,
        sequence,
        config.file_extension,
        width = SEQUENCE_WIDTH
    )
}

/// Full path of the segment with the given sequence number.
pub(crate) fn segment_path(config: &DurableLogConfig, sequence: u64) -> PathBuf {
    config.folder.join(segment_file_name(config, sequence))
}

/// Extract the sequence number from a segment file name, if it matches the
/// configured naming scheme.
pub(crate) fn parse_sequence(config: &DurableLogConfig, file_name: &str) -> Option<u64> {
    file_name
        .strip_prefix(&config.file_prefix)?
        .strip_suffix(&config.file_extension)?
        .parse()
        .ok()
}

/// Scan the configured folder for segment files, oldest first.
///
/// Files that do not match the naming scheme are left alone; they may
/// belong to another tenant of the folder.
pub(crate) fn scan_segments(config: &DurableLogConfig) -> Result<Vec<SegmentMeta>> {
    let folder: &Path = &config.folder;
    let mut segments = Vec::new();

    for entry in fs::read_dir(folder).context(IoSnafu { path: folder })? {
        let entry = entry.context(IoSnafu { path: folder })?;
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        let Some(sequence) = parse_sequence(config, &name) else {
            if !name.starts_with('.') {
                warn!(file = %name, "ignoring unrecognized file in log folder");
            }
            continue;
        };
        let metadata = entry.metadata().context(IoSnafu { path: folder })?;
        if !metadata.is_file() {
            continue;
        }
        segments.push(SegmentMeta {
            sequence,
            path: entry.path(),
            size: metadata.len(),
        });
    }

    segments.sort_by_key(|segment| segment.sequence);
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_in(folder: &Path) -> DurableLogConfig {
        DurableLogConfig {
            folder: folder.to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn test_file_name_is_zero_padded() {
        let config = DurableLogConfig::default();
        assert_eq!(segment_file_name(&config, 0), "spool_0000000000.log");
        assert_eq!(segment_file_name(&config, 42), "spool_0000000042.log");
        assert_eq!(segment_file_name(&config, 9_876_543_210), "spool_9876543210.log");
    }

    #[test]
    fn test_lexicographic_order_matches_numeric_order() {
        let config = DurableLogConfig::default();
        let names: Vec<_> = [1u64, 9, 10, 99, 100, 1000]
            .iter()
            .map(|sequence| segment_file_name(&config, *sequence))
            .collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_parse_sequence_round_trip() {
        let config = DurableLogConfig::default();
        for sequence in [0u64, 7, 123, 9_999_999_999] {
            let name = segment_file_name(&config, sequence);
            assert_eq!(parse_sequence(&config, &name), Some(sequence));
        }
    }

    #[test]
    fn test_parse_sequence_rejects_foreign_names() {
        let config = DurableLogConfig::default();
        assert_eq!(parse_sequence(&config, "other_0000000001.log"), None);
        assert_eq!(parse_sequence(&config, "spool_0000000001.txt"), None);
        assert_eq!(parse_sequence(&config, "spool_not_a_number.log"), None);
        assert_eq!(parse_sequence(&config, "notes.md"), None);
    }

    #[test]
    fn test_scan_finds_segments_oldest_first() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        for sequence in [5u64, 1, 3] {
            fs::write(segment_path(&config, sequence), b"data").unwrap();
        }
        fs::write(dir.path().join("unrelated.txt"), b"noise").unwrap();

        let segments = scan_segments(&config).unwrap();
        let sequences: Vec<_> = segments.iter().map(|s| s.sequence).collect();
        assert_eq!(sequences, vec![1, 3, 5]);
        assert!(segments.iter().all(|s| s.size == 4));
    }

    #[test]
    fn test_scan_empty_folder() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        assert!(scan_segments(&config).unwrap().is_empty());
    }
}
