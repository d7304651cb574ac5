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

use crate::{DurableLog, DurableLogConfig, Result};

pub struct DurableLogBuilder {
    config: DurableLogConfig,
}

impl DurableLogBuilder {
    pub fn new<P: Into<PathBuf>>(folder: P) -> Self {
        Self {
            config: DurableLogConfig {
                folder: folder.into(),
                ..Default::default()
            },
        }
    }

    #[must_use]
    pub fn file_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.config.file_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn file_extension<S: Into<String>>(mut self, extension: S) -> Self {
        self.config.file_extension = extension.into();
        self
    }

    #[must_use]
    pub fn max_file_size(mut self, size: u64) -> Self {
        self.config.max_file_size = size;
        self
    }

    #[must_use]
    pub fn storage_limit(mut self, limit: u64) -> Self {
        self.config.storage_limit = limit;
        self
    }

    /// Open the log: create the folder if needed and adopt any segment
    /// files a previous instance left behind.
    pub fn build(self) -> Result<DurableLog> {
        DurableLog::open(self.config)
    }
}
