// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Common helpers for line-oriented command output.

use crate::error::ParseError;

/// Delimiter used by `nvidia-smi --format=csv`.
pub const FIELD_DELIMITER: char = ',';

/// Non-blank lines of `raw`, paired with their 1-based line number.
///
/// Blank lines carry no record (trailing newlines, padding) and are not
/// counted as malformed.
pub fn content_lines(raw: &str) -> impl Iterator<Item = (usize, &str)> {
    raw.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line))
        .filter(|(_, line)| !line.trim().is_empty())
}

/// Split a CSV line into at most `max_fields` fields, trimming whitespace
/// around each. The last field keeps any further delimiters verbatim.
pub fn split_fields(line: &str, max_fields: usize) -> Vec<&str> {
    line.splitn(max_fields, FIELD_DELIMITER)
        .map(str::trim)
        .collect()
}

/// `nvidia-smi` placeholders such as `[N/A]` or `[Not Supported]`.
pub fn is_placeholder(value: &str) -> bool {
    value.starts_with('[') && value.ends_with(']')
}

pub fn malformed(line: usize, content: &str, reason: impl Into<String>) -> ParseError {
    ParseError::MalformedLine {
        line,
        content: content.to_string(),
        reason: reason.into(),
    }
}
