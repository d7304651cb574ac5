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

use snafu::Snafu;

/// Dataflow layer errors.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DataflowError {
    /// A queue monitor can wait on at most [`crate::status::MAX_GROUP_MONITORS`]
    /// sources through one status group.
    #[snafu(display("Queue monitor already tracks the maximum of {limit} sources"))]
    TooManySources {
        limit: usize,
        #[snafu(implicit)]
        loc:   snafu::Location,
    },
}

/// Result type for dataflow operations.
pub type Result<T> = std::result::Result<T, DataflowError>;
