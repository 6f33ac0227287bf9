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

// Commands run on every server and the line formats they produce.

/// One GPU per line: `<index>, <uuid>, <name>`.
pub const INVENTORY_QUERY: &str = "nvidia-smi --query-gpu=index,uuid,name --format=csv,noheader";

/// One compute process per line: `<gpu uuid>, <pid>`.
pub const PROCESS_QUERY: &str =
    "nvidia-smi --query-compute-apps=gpu_uuid,pid --format=csv,noheader";

/// Ownership of the given pids, one `<pid> <user>` pair per line.
pub fn owner_query(pids: &[u32]) -> String {
    let pids = pids
        .iter()
        .map(|pid| pid.to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!("ps -o pid= -o ruser= -p {pids}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_query() {
        assert_eq!(owner_query(&[42]), "ps -o pid= -o ruser= -p 42");
        assert_eq!(
            owner_query(&[1200, 1201, 3]),
            "ps -o pid= -o ruser= -p 1200,1201,3"
        );
    }
}
