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

use serde::Serialize;

use crate::error::ServerFailure;

/// Addresses that are queried on this machine instead of over SSH.
const LOCAL_ADDRESSES: [&str; 3] = [".", "localhost", "127.0.0.1"];

/// One configured server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerTarget {
    pub address: String,
    /// Effective remote username: the explicit override, or the local identity.
    pub username: String,
    /// Whether `username` was given explicitly and must be passed to ssh.
    #[serde(skip)]
    pub user_override: bool,
}

impl ServerTarget {
    /// Target that connects as whoever ssh would pick by default.
    pub fn new(address: impl Into<String>, local_user: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            username: local_user.into(),
            user_override: false,
        }
    }

    /// Target that always connects as `user`.
    pub fn with_user(address: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            username: user.into(),
            user_override: true,
        }
    }

    /// The `[user@]host` argument handed to ssh.
    pub fn ssh_destination(&self) -> String {
        if self.user_override {
            format!("{}@{}", self.username, self.address)
        } else {
            self.address.clone()
        }
    }

    pub fn is_local(&self) -> bool {
        LOCAL_ADDRESSES.contains(&self.address.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GpuDevice {
    pub index: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    pub model: String,
}

/// One process's claim on a GPU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Occupant {
    pub username: String,
    pub pid: u32,
    pub display_name: Option<String>,
}

impl Occupant {
    pub fn new(username: impl Into<String>, pid: u32) -> Self {
        Self {
            username: username.into(),
            pid,
            display_name: None,
        }
    }

    /// Name to show: the resolved display name, falling back to the username.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GpuUsage {
    pub device: GpuDevice,
    pub occupants: Vec<Occupant>,
}

impl GpuUsage {
    pub fn is_free(&self) -> bool {
        self.occupants.is_empty()
    }

    pub fn is_used_by(&self, username: &str) -> bool {
        self.occupants.iter().any(|o| o.username == username)
    }

    /// Distinct occupants in first-seen order, one per username.
    pub fn distinct_users(&self) -> Vec<&Occupant> {
        let mut seen: Vec<&Occupant> = Vec::new();
        for occupant in &self.occupants {
            if !seen.iter().any(|o| o.username == occupant.username) {
                seen.push(occupant);
            }
        }
        seen
    }
}

/// Outcome for one server: a complete usage table or a contained failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerReport {
    pub target: ServerTarget,
    #[serde(with = "report_result")]
    pub result: Result<Vec<GpuUsage>, ServerFailure>,
}

impl ServerReport {
    pub fn ok(target: ServerTarget, gpus: Vec<GpuUsage>) -> Self {
        Self {
            target,
            result: Ok(gpus),
        }
    }

    pub fn failed(target: ServerTarget, failure: ServerFailure) -> Self {
        Self {
            target,
            result: Err(failure),
        }
    }

    pub fn gpus(&self) -> Option<&[GpuUsage]> {
        self.result.as_deref().ok()
    }
}

/// Per-server reports in configuration order.
pub type FleetReport = Vec<ServerReport>;

mod report_result {
    use serde::ser::SerializeMap;
    use serde::Serializer;

    use super::GpuUsage;
    use crate::error::ServerFailure;

    pub fn serialize<S: Serializer>(
        result: &Result<Vec<GpuUsage>, ServerFailure>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match result {
            Ok(gpus) => map.serialize_entry("gpus", gpus)?,
            Err(failure) => map.serialize_entry("error", failure)?,
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    fn usage(index: u32, users: &[&str]) -> GpuUsage {
        GpuUsage {
            device: GpuDevice {
                index,
                uuid: None,
                model: "NVIDIA A100-SXM4-40GB".to_string(),
            },
            occupants: users
                .iter()
                .enumerate()
                .map(|(i, u)| Occupant::new(*u, 1000 + i as u32))
                .collect(),
        }
    }

    #[test]
    fn test_ssh_destination() {
        let target = ServerTarget::new("gpu1.example.org", "alice");
        assert_eq!(target.ssh_destination(), "gpu1.example.org");

        let target = ServerTarget::with_user("gpu1.example.org", "bob");
        assert_eq!(target.ssh_destination(), "bob@gpu1.example.org");
    }

    #[test]
    fn test_local_targets() {
        assert!(ServerTarget::new(".", "alice").is_local());
        assert!(ServerTarget::new("localhost", "alice").is_local());
        assert!(ServerTarget::new("127.0.0.1", "alice").is_local());
        assert!(!ServerTarget::new("gpu1", "alice").is_local());
    }

    #[test]
    fn test_occupant_label_falls_back_to_username() {
        let mut occupant = Occupant::new("bob", 42);
        assert_eq!(occupant.label(), "bob");
        occupant.display_name = Some("Bob Builder".to_string());
        assert_eq!(occupant.label(), "Bob Builder");
    }

    #[test]
    fn test_distinct_users_keeps_first_seen_order() {
        let gpu = usage(0, &["carol", "alice", "carol"]);
        let users: Vec<&str> = gpu
            .distinct_users()
            .iter()
            .map(|o| o.username.as_str())
            .collect();
        assert_eq!(users, vec!["carol", "alice"]);
        assert!(gpu.is_used_by("alice"));
        assert!(!gpu.is_free());
        assert!(usage(1, &[]).is_free());
    }

    #[test]
    fn test_server_report_serialization() {
        let report = ServerReport::ok(ServerTarget::new("gpu1", "alice"), vec![usage(0, &[])]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["target"]["address"], "gpu1");
        assert_eq!(json["result"]["gpus"][0]["device"]["index"], 0);

        let report = ServerReport::failed(
            ServerTarget::new("gpu2", "alice"),
            ServerFailure::new(FailureKind::Timeout, "Command timed out after 5s"),
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["result"]["error"]["kind"], "timeout");
        assert!(report.gpus().is_none());
    }
}
