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

use std::path::PathBuf;

/// Configuration of a [`DurableLog`](crate::DurableLog).
#[derive(Debug, Clone)]
pub struct DurableLogConfig {
    /// Folder holding every segment file. Exclusively owned by one log
    /// instance at a time.
    pub folder:         PathBuf,
    /// Prefix of each segment file name.
    pub file_prefix:    String,
    /// Extension of each segment file name, including the leading dot.
    pub file_extension: String,
    /// Size at which the active segment is sealed and a new one opened.
    pub max_file_size:  u64,
    /// Ceiling on the total bytes across all segments. When exceeded, the
    /// oldest sealed segments are deleted until back under the quota.
    pub storage_limit:  u64,
}

impl Default for DurableLogConfig {
    fn default() -> Self {
        Self {
            folder:         PathBuf::from("./spool_data"),
            file_prefix:    "spool_".to_string(),
            file_extension: ".log".to_string(),
            max_file_size:  1024 * 1024,
            storage_limit:  25 * 1024 * 1024,
        }
    }
}
