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

//! GPU availability and usage across a fleet of SSH-reachable servers.
//!
//! Every server is asked for its GPU inventory and compute processes with
//! `nvidia-smi`, process owners are looked up with `ps`, and the results
//! are merged into one [`types::FleetReport`]. See [`prelude`] for the
//! commonly used types.

pub mod cli;
pub mod error;
pub mod fleet;
pub mod identity;
pub mod parsing;
pub mod prelude;
pub mod remote;
pub mod types;
pub mod ui;
pub mod utils;

pub mod common {
    pub mod config;
    pub mod hostfile;
}

pub use error::{Error, Result};
