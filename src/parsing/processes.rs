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

//! Parser for the GPU compute-process listing.
//!
//! `nvidia-smi` reports which process runs on which GPU but not who owns
//! it, so occupants are built in two steps: [`parse_process_list`] reads
//! the `<gpu>, <pid>` lines, then [`assign_owners`] looks every pid up in
//! the ownership table produced by `ps` on the same server.
//!
//! Unlike the inventory, ownership is allowed to be incomplete. A process
//! can exit between the two queries; such entries are skipped with a
//! warning instead of failing the server.

use std::collections::{BTreeMap, HashMap};

use tracing::warn;

use super::common::{content_lines, is_placeholder, malformed, split_fields};
use crate::error::ParseError;
use crate::types::{GpuDevice, Occupant};

/// How a process line names its GPU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpuRef {
    Index(u32),
    Uuid(String),
}

impl GpuRef {
    fn parse(field: &str) -> Self {
        match field.parse::<u32>() {
            Ok(index) => GpuRef::Index(index),
            Err(_) => GpuRef::Uuid(field.to_string()),
        }
    }

    fn resolve(&self, devices: &[GpuDevice]) -> Option<u32> {
        match self {
            GpuRef::Index(index) => devices.iter().find(|d| d.index == *index).map(|d| d.index),
            GpuRef::Uuid(uuid) => devices
                .iter()
                .find(|d| d.uuid.as_deref() == Some(uuid.as_str()))
                .map(|d| d.index),
        }
    }
}

impl std::fmt::Display for GpuRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GpuRef::Index(index) => write!(f, "{index}"),
            GpuRef::Uuid(uuid) => write!(f, "{uuid}"),
        }
    }
}

/// One line of the process listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpuProcess {
    pub gpu: GpuRef,
    pub pid: u32,
}

/// Read `<gpu>, <pid>` lines in reported order.
pub fn parse_process_list(raw: &str) -> Result<Vec<GpuProcess>, ParseError> {
    let mut processes = Vec::new();

    for (line_no, line) in content_lines(raw) {
        // Older drivers print a notice instead of an empty listing
        if line.trim().starts_with("No running processes found") {
            continue;
        }

        let fields = split_fields(line, 2);
        if fields.len() < 2 || fields[0].is_empty() {
            return Err(malformed(line_no, line, "expected '<gpu>, <pid>'"));
        }

        // Processes in other PID namespaces are reported without a pid
        if is_placeholder(fields[1]) {
            warn!(line_no, "Skipping GPU process without a visible pid: {line}");
            continue;
        }

        let pid = fields[1]
            .parse::<u32>()
            .map_err(|_| malformed(line_no, line, format!("invalid pid '{}'", fields[1])))?;

        processes.push(GpuProcess {
            gpu: GpuRef::parse(fields[0]),
            pid,
        });
    }

    Ok(processes)
}

/// Distinct pids in first-seen order, for the ownership query.
pub fn distinct_pids(processes: &[GpuProcess]) -> Vec<u32> {
    let mut pids: Vec<u32> = Vec::with_capacity(processes.len());
    for process in processes {
        if !pids.contains(&process.pid) {
            pids.push(process.pid);
        }
    }
    pids
}

/// Group processes by GPU index, attaching each pid's owner.
///
/// Processes whose GPU is not in `devices` or whose pid has no owner are
/// dropped with a warning.
pub fn assign_owners(
    processes: &[GpuProcess],
    devices: &[GpuDevice],
    owners: &HashMap<u32, String>,
) -> BTreeMap<u32, Vec<Occupant>> {
    let mut occupants: BTreeMap<u32, Vec<Occupant>> = BTreeMap::new();

    for process in processes {
        let Some(index) = process.gpu.resolve(devices) else {
            warn!(gpu = %process.gpu, pid = process.pid, "Process runs on an unknown GPU, skipping");
            continue;
        };
        let Some(owner) = owners.get(&process.pid) else {
            warn!(gpu = index, pid = process.pid, "No owner found for process, it may have exited");
            continue;
        };
        occupants
            .entry(index)
            .or_default()
            .push(Occupant::new(owner.clone(), process.pid));
    }

    occupants
}

/// Parse a process listing and resolve owners in one step.
pub fn parse_processes(
    raw: &str,
    devices: &[GpuDevice],
    owners: &HashMap<u32, String>,
) -> Result<BTreeMap<u32, Vec<Occupant>>, ParseError> {
    let processes = parse_process_list(raw)?;
    Ok(assign_owners(&processes, devices, owners))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn devices() -> Vec<GpuDevice> {
        (0..4)
            .map(|i| GpuDevice {
                index: i,
                uuid: Some(format!("GPU-000{i}")),
                model: "NVIDIA GeForce RTX 3090".to_string(),
            })
            .collect()
    }

    fn owners(pairs: &[(u32, &str)]) -> HashMap<u32, String> {
        pairs
            .iter()
            .map(|(pid, user)| (*pid, user.to_string()))
            .collect()
    }

    fn users(occupants: &[Occupant]) -> Vec<&str> {
        occupants.iter().map(|o| o.username.as_str()).collect()
    }

    #[test]
    fn test_parse_process_list() {
        let processes = parse_process_list("GPU-0001, 4242\n2, 17\n").unwrap();
        assert_eq!(
            processes,
            vec![
                GpuProcess {
                    gpu: GpuRef::Uuid("GPU-0001".to_string()),
                    pid: 4242
                },
                GpuProcess {
                    gpu: GpuRef::Index(2),
                    pid: 17
                },
            ]
        );
    }

    #[test]
    fn test_multiple_processes_per_gpu_keep_order_and_duplicates() {
        let raw = "GPU-0001, 100\nGPU-0003, 300\nGPU-0001, 101\nGPU-0001, 102\n";
        let map = parse_processes(
            raw,
            &devices(),
            &owners(&[(100, "alice"), (101, "bob"), (102, "alice"), (300, "carol")]),
        )
        .unwrap();

        assert_eq!(map.len(), 2);
        assert_eq!(users(&map[&1]), vec!["alice", "bob", "alice"]);
        assert_eq!(map[&1][2].pid, 102);
        assert_eq!(users(&map[&3]), vec!["carol"]);
        assert!(!map.contains_key(&0));
    }

    #[test]
    fn test_exited_process_is_skipped() {
        let raw = "GPU-0000, 100\nGPU-0000, 101\n";
        let map = parse_processes(raw, &devices(), &owners(&[(101, "bob")])).unwrap();
        assert_eq!(users(&map[&0]), vec!["bob"]);
    }

    #[test]
    fn test_unknown_gpu_is_skipped() {
        let raw = "GPU-ffff, 100\n9, 101\n";
        let map =
            parse_processes(raw, &devices(), &owners(&[(100, "alice"), (101, "bob")])).unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn test_empty_listing_and_notice() {
        assert!(parse_process_list("").unwrap().is_empty());
        assert!(parse_process_list("No running processes found\n")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_placeholder_pid_is_skipped() {
        let processes = parse_process_list("GPU-0000, [N/A]\nGPU-0000, 5\n").unwrap();
        assert_eq!(processes.len(), 1);
        assert_eq!(processes[0].pid, 5);
    }

    #[test]
    fn test_structurally_invalid_line_is_an_error() {
        let ParseError::MalformedLine { line, .. } =
            parse_process_list("GPU-0000, 5\ngarbage\n").unwrap_err();
        assert_eq!(line, 2);

        let ParseError::MalformedLine { reason, .. } =
            parse_process_list("GPU-0000, five\n").unwrap_err();
        assert_eq!(reason, "invalid pid 'five'");
    }

    #[test]
    fn test_distinct_pids() {
        let processes = parse_process_list("0, 7\n1, 3\n2, 7\n").unwrap();
        assert_eq!(distinct_pids(&processes), vec![7, 3]);
    }
}
