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

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{RawOutput, RemoteSession};
use crate::common::config::AppConfig;
use crate::error::ExecutionError;
use crate::types::ServerTarget;
use crate::utils::command_timeout::run_command_with_timeout;

/// Exit status ssh uses for its own failures (connection, auth, DNS).
const SSH_ERROR_STATUS: i32 = 255;

/// Runs commands through the system `ssh` client, or through `sh` for
/// local targets.
///
/// Authentication is left entirely to ssh (agent, keys, `~/.ssh/config`).
/// `BatchMode` makes ssh fail instead of prompting for a password. Every
/// call opens a fresh connection; nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct SshSession {
    connect_timeout: Duration,
}

impl SshSession {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    /// Arguments passed to `ssh` for running `command` on `target`.
    ///
    /// The remote side runs the command under coreutils `timeout` so a hung
    /// `nvidia-smi` is killed on the server once the local budget is spent.
    pub fn ssh_args(
        &self,
        target: &ServerTarget,
        command: &str,
        timeout: Duration,
    ) -> Vec<String> {
        // ConnectTimeout only takes whole seconds; never round down to "no timeout"
        let connect_secs = self.connect_timeout.as_secs().max(1);
        vec![
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={connect_secs}"),
            "--".to_string(),
            target.ssh_destination(),
            format!("timeout {} {command}", whole_secs_ceil(timeout)),
        ]
    }

    fn build_command(&self, target: &ServerTarget, command: &str, timeout: Duration) -> Command {
        if target.is_local() {
            let mut cmd = Command::new("sh");
            cmd.args(["-c", command]);
            cmd
        } else {
            let mut cmd = Command::new("ssh");
            cmd.args(self.ssh_args(target, command, timeout));
            cmd
        }
    }
}

fn whole_secs_ceil(duration: Duration) -> u64 {
    let secs = duration.as_secs() + u64::from(duration.subsec_nanos() > 0);
    secs.max(1)
}

impl Default for SshSession {
    fn default() -> Self {
        Self::new(Duration::from_secs(AppConfig::DEFAULT_SSH_TIMEOUT_SECS))
    }
}

#[async_trait]
impl RemoteSession for SshSession {
    async fn run(
        &self,
        target: &ServerTarget,
        command: &str,
        timeout: Duration,
    ) -> Result<RawOutput, ExecutionError> {
        debug!(server = %target.address, command, "Running command");

        let output = match run_command_with_timeout(self.build_command(target, command, timeout), timeout)
            .await
        {
            Ok(output) => output,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                debug!(server = %target.address, command, "Command timed out");
                return Err(ExecutionError::Timeout(timeout));
            }
            Err(e) if target.is_local() => {
                return Err(ExecutionError::CommandFailed {
                    command: command.to_string(),
                    code: None,
                    stderr: e.to_string(),
                });
            }
            Err(e) => {
                return Err(ExecutionError::ConnectionFailed {
                    target: target.address.clone(),
                    message: format!("Failed to start ssh: {e}"),
                });
            }
        };

        let status = output.status.code();
        let out = RawOutput {
            status: status.unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        if output.status.success() {
            return Ok(out);
        }

        debug!(
            server = %target.address,
            command,
            code = ?status,
            stderr = %out.stderr.trim(),
            "Command failed"
        );

        if status == Some(SSH_ERROR_STATUS) && !target.is_local() {
            return Err(ExecutionError::ConnectionFailed {
                target: target.address.clone(),
                message: out.stderr.trim().to_string(),
            });
        }

        Err(ExecutionError::CommandFailed {
            command: command.to_string(),
            code: status,
            stderr: out.stderr.trim().to_string(),
        })
    }
}
