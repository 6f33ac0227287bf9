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

//! The fleet-smi prelude.
//!
//! Convenient re-exports for library users:
//!
//! ```rust
//! use fleet_smi::prelude::*;
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use fleet_smi::prelude::*;
//!
//! #[tokio::main]
//! async fn main() {
//!     let fleet = Fleet::new(Arc::new(SshSession::default()));
//!     let targets = vec![ServerTarget::new("gpu1.example.org", "alice")];
//!     let report = fleet
//!         .gather(&targets, &GatherOptions::default(), Duration::from_secs(50))
//!         .await;
//!
//!     for server in &report {
//!         match &server.result {
//!             Ok(gpus) => println!("{}: {} GPU(s)", server.target.address, gpus.len()),
//!             Err(failure) => println!("{}: {failure}", server.target.address),
//!         }
//!     }
//! }
//! ```

// Collection
pub use crate::fleet::{Fleet, GatherOptions};
pub use crate::identity::{IdentityResolver, IdentitySource};

// Remote execution
pub use crate::remote::{RawOutput, RemoteSession, ScriptedSession, SshSession};

// Error types
pub use crate::error::{
    Error, ExecutionError, FailureKind, ParseError, ResolutionError, Result, ServerFailure,
};

// Report data types
pub use crate::types::{FleetReport, GpuDevice, GpuUsage, Occupant, ServerReport, ServerTarget};
