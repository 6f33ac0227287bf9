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

// Parser for `ps -o pid= -o ruser=` output: `<pid> <user>` per line.

use std::collections::HashMap;

use tracing::warn;

use super::common::content_lines;

/// Map pid to the real user owning it. Unreadable lines are skipped.
pub fn parse_owners(raw: &str) -> HashMap<u32, String> {
    let mut owners = HashMap::new();

    for (line_no, line) in content_lines(raw) {
        let mut parts = line.split_whitespace();
        match (
            parts.next().and_then(|pid| pid.parse::<u32>().ok()),
            parts.next(),
        ) {
            (Some(pid), Some(user)) => {
                owners.insert(pid, user.to_string());
            }
            _ => warn!(line_no, "Skipping unreadable ps line: {line}"),
        }
    }

    owners
}
