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

use std::{io, path::PathBuf};

use snafu::Snafu;

/// Durable log errors.
///
/// Filesystem failures are recoverable at the component level: the caller
/// may retry the operation or skip it. Only a folder that cannot be created
/// at open time is fatal to the instance.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DurableLogError {
    /// Filesystem I/O failure.
    #[snafu(display("I/O failure on {}", path.display()))]
    Io {
        path:   PathBuf,
        source: io::Error,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    /// CRC mismatch detected while decoding a frame.
    #[snafu(display("Corrupted frame in segment {sequence} at offset {offset}"))]
    CorruptedFrame {
        sequence: u64,
        offset:   u64,
        #[snafu(implicit)]
        loc:      snafu::Location,
    },

    /// The payload cannot be framed: the length prefix is a u32.
    #[snafu(display("Record of {size} bytes exceeds the maximum frame size"))]
    RecordTooLarge {
        size: usize,
        #[snafu(implicit)]
        loc:  snafu::Location,
    },

    /// The token does not identify the outstanding checked-out read.
    #[snafu(display("Data token {token} does not match the outstanding read"))]
    StaleToken {
        token: u64,
        #[snafu(implicit)]
        loc:   snafu::Location,
    },

    /// `~` expansion was requested but no home-directory variable is set.
    #[snafu(display("Cannot expand '~': no home directory variable is set"))]
    NoHomeDirectory {
        #[snafu(implicit)]
        loc: snafu::Location,
    },
}

/// Result type for durable log operations.
pub type Result<T> = std::result::Result<T, DurableLogError>;
