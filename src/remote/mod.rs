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

//! Remote command execution.
//!
//! [`RemoteSession`] is the capability the rest of the crate depends on:
//! run one command on one server and get its output back, or a typed
//! [`ExecutionError`]. [`SshSession`] implements it with the system ssh
//! client; [`ScriptedSession`] answers from a fixed script and never
//! touches the network.

pub mod commands;
pub mod scripted;
pub mod ssh;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ExecutionError;
use crate::types::ServerTarget;

pub use scripted::ScriptedSession;
pub use ssh::SshSession;

/// Captured output of a command that exited successfully.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawOutput {
    /// Process exit code (or -1 if unavailable)
    pub status: i32,
    /// UTF-8 (lossy) decoded stdout
    pub stdout: String,
    /// UTF-8 (lossy) decoded stderr
    pub stderr: String,
}

impl RawOutput {
    pub fn from_stdout(stdout: impl Into<String>) -> Self {
        Self {
            status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }
}

/// Runs commands on a server.
#[async_trait]
pub trait RemoteSession: Send + Sync {
    /// Execute `command` non-interactively on `target`.
    ///
    /// Implementations must give up after `timeout` and return
    /// [`ExecutionError::Timeout`], and must report a non-zero exit as
    /// [`ExecutionError::CommandFailed`] rather than as output.
    async fn run(
        &self,
        target: &ServerTarget,
        command: &str,
        timeout: Duration,
    ) -> Result<RawOutput, ExecutionError>;
}
