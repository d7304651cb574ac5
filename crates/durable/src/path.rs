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

//! Folder path resolution for configuration values.
//!
//! Configured folders may start with `~`, meaning "home directory". The
//! substitution reads the environment through an injected lookup so the
//! resolution stays a pure function in tests (no process-wide env
//! mutation).

use std::path::MAIN_SEPARATOR;

use snafu::OptionExt;

use crate::error::{NoHomeDirectorySnafu, Result};

/// Variables consulted, in order, when substituting a leading `~`.
const HOME_VARS: [&str; 2] = ["HOME", "SPOOL_HOME"];

/// Resolve a configured folder path.
///
/// A leading `~` (alone, or followed by a path separator) is replaced with
/// the first non-empty value of [`HOME_VARS`] returned by `lookup`. The
/// result always carries a trailing path separator.
///
/// # Errors
///
/// Returns [`DurableLogError::NoHomeDirectory`](crate::DurableLogError::NoHomeDirectory)
/// when substitution is needed but no home variable is set.
pub fn expand_home<F>(raw: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut path = match raw.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with(MAIN_SEPARATOR) => {
            let home = HOME_VARS
                .iter()
                .find_map(|var| lookup(var).filter(|value| !value.is_empty()))
                .context(NoHomeDirectorySnafu)?;
            format!("{}{rest}", home.trim_end_matches(MAIN_SEPARATOR))
        }
        _ => raw.to_string(),
    };

    if !path.ends_with(MAIN_SEPARATOR) {
        path.push(MAIN_SEPARATOR);
    }
    Ok(path)
}

/// [`expand_home`] against the process environment.
pub fn expand_home_from_env(raw: &str) -> Result<String> {
    expand_home(raw, |var| std::env::var(var).ok())
}
