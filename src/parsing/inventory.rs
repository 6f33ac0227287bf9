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

//! Parser for the GPU inventory query.
//!
//! Each line is `<index>, <uuid>, <name>` as printed by
//! `nvidia-smi --query-gpu=index,uuid,name --format=csv,noheader`. The
//! shorter `<index>, <name>` form is accepted too. The name is taken
//! verbatim so unknown or future models are reported as-is.
//!
//! Any line that cannot be read aborts the whole inventory: a partial GPU
//! list would misreport availability.

use std::collections::HashSet;

use super::common::{content_lines, malformed, split_fields};
use crate::error::ParseError;
use crate::types::GpuDevice;

/// Driver UUID prefixes for full GPUs and MIG instances.
const UUID_PREFIXES: [&str; 2] = ["GPU-", "MIG-"];

pub fn parse_inventory(raw: &str) -> Result<Vec<GpuDevice>, ParseError> {
    let mut devices = Vec::new();
    let mut seen = HashSet::new();

    for (line_no, line) in content_lines(raw) {
        let fields = split_fields(line, 2);
        if fields.len() < 2 {
            return Err(malformed(
                line_no,
                line,
                "expected '<index>, <uuid>, <name>' or '<index>, <name>'",
            ));
        }

        let index = fields[0].parse::<u32>().map_err(|_| {
            malformed(line_no, line, format!("invalid GPU index '{}'", fields[0]))
        })?;

        let (uuid, model) = split_uuid(fields[1]);
        if model.is_empty() {
            return Err(malformed(line_no, line, "empty GPU name"));
        }
        if !seen.insert(index) {
            return Err(malformed(
                line_no,
                line,
                format!("duplicate GPU index {index}"),
            ));
        }

        devices.push(GpuDevice {
            index,
            uuid: uuid.map(str::to_string),
            model: model.to_string(),
        });
    }

    Ok(devices)
}

/// Split `<uuid>, <name>` when the first field is a driver UUID; otherwise
/// the whole remainder is the name.
fn split_uuid(rest: &str) -> (Option<&str>, &str) {
    if let Some((head, tail)) = rest.split_once(super::common::FIELD_DELIMITER) {
        let head = head.trim();
        if UUID_PREFIXES.iter().any(|p| head.starts_with(p)) {
            return (Some(head), tail.trim());
        }
    }
    (None, rest.trim())
}
