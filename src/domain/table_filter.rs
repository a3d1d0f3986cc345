// Copyright 2026 Google LLC
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

//! # Table Filter
//!
//! Decides whether a table is skipped. Two rules, evaluated in order:
//!
//! 1. **Exclusion patterns**: shell globs matched against `<dataset>.<table>`.
//!    The first match excludes the table.
//! 2. **Retention**: a table named `<anything>_YYYYMMDD` is a daily partition.
//!    If that date is strictly before the cutoff, the table is excluded.
//!
//! A suffix of 8 digits that is not a calendar date (`events_20231345`) is
//! treated as "not partitioned": the table is kept and no error is raised.
//!
//! Patterns use [`glob::Pattern`] syntax. Character classes are negated
//! with `[!...]` (`[^...]` is a literal `^`), and `**` is only valid as a
//! whole path component, so `SAS**` is rejected as malformed. Write `SAS*`.

use crate::domain::errors::{ExportError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use glob::Pattern;
use log::debug;
use regex::Regex;
use std::sync::LazyLock;

static DATE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^.+_([0-9]{8})$").expect("date suffix regex is valid"));

const DATE_SUFFIX_FORMAT: &str = "%Y%m%d";

/// Exclusion rules compiled once per run.
#[derive(Debug, Clone)]
pub struct TableFilter {
    patterns: Vec<Pattern>,
    cutoff: DateTime<Utc>,
}

impl TableFilter {
    /// Compiles every pattern up front so a malformed one fails the run
    /// before any export work begins.
    pub fn new(patterns: &[String], cutoff: DateTime<Utc>) -> Result<Self> {
        let patterns = patterns
            .iter()
            .filter(|p| !p.trim().is_empty())
            .map(|p| compile_pattern(p))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns, cutoff })
    }

    pub fn cutoff(&self) -> DateTime<Utc> {
        self.cutoff
    }

    /// Returns true when `<dataset_id>.<table_id>` should be skipped.
    pub fn is_excluded(&self, dataset_id: &str, table_id: &str) -> bool {
        let qualified_name = format!("{}.{}", dataset_id, table_id);
        if let Some(p) = self.patterns.iter().find(|p| p.matches(&qualified_name)) {
            debug!("{} matches exclusion pattern {}", qualified_name, p.as_str());
            return true;
        }

        match partition_date(table_id) {
            Some(date) => {
                let older = date
                    .and_hms_opt(0, 0, 0)
                    .map(|midnight| midnight.and_utc() < self.cutoff)
                    .unwrap_or(false);
                if older {
                    debug!("{} is older than cutoff {}", qualified_name, self.cutoff);
                }
                older
            }
            None => false,
        }
    }
}

/// Decides whether `qualified_name` (`<dataset>.<table>`) is excluded.
///
/// Malformed patterns surface as `ConfigError` rather than a silent `false`.
pub fn should_exclude(
    qualified_name: &str,
    patterns: &[String],
    cutoff: DateTime<Utc>,
) -> Result<bool> {
    let filter = TableFilter::new(patterns, cutoff)?;
    let (dataset_id, table_id) = qualified_name.split_once('.').unwrap_or(("", qualified_name));
    Ok(filter.is_excluded(dataset_id, table_id))
}

fn compile_pattern(pattern: &str) -> Result<Pattern> {
    Pattern::new(pattern).map_err(|e| {
        ExportError::ConfigError(format!("pattern {} is malformed: {}", pattern, e))
    })
}

/// Parses the `_YYYYMMDD` suffix of a daily-partitioned table name.
fn partition_date(table_id: &str) -> Option<NaiveDate> {
    let digits = DATE_SUFFIX.captures(table_id)?.get(1)?.as_str();
    match NaiveDate::parse_from_str(digits, DATE_SUFFIX_FORMAT) {
        Ok(date) => Some(date),
        Err(e) => {
            debug!("{} has a non-date suffix {}: {}", table_id, digits, e);
            None
        }
    }
}
