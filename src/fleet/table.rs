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

// Building and narrowing one server's GPU usage table.

use std::collections::BTreeMap;

use crate::types::{GpuDevice, GpuUsage, Occupant};

/// Combine the inventory with the occupant map, keeping inventory order.
/// Devices without an entry are free.
pub fn merge(devices: Vec<GpuDevice>, mut occupants: BTreeMap<u32, Vec<Occupant>>) -> Vec<GpuUsage> {
    devices
        .into_iter()
        .map(|device| GpuUsage {
            occupants: occupants.remove(&device.index).unwrap_or_default(),
            device,
        })
        .collect()
}

/// Keep only GPUs with at least one occupant named `username`.
pub fn retain_user(mut gpus: Vec<GpuUsage>, username: &str) -> Vec<GpuUsage> {
    gpus.retain(|gpu| gpu.is_used_by(username));
    gpus
}
