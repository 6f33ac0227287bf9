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

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{RawOutput, RemoteSession};
use crate::error::ExecutionError;
use crate::types::ServerTarget;

type Response = Result<RawOutput, ExecutionError>;

/// A [`RemoteSession`] that answers from a fixed script.
///
/// Responses are keyed by server address and exact command string.
/// Unscripted commands fail the way a shell would with exit code 127.
/// A per-server delay is applied before every answer and counts against
/// the caller's timeout, so slow or hanging servers can be simulated
/// deterministically (including under tokio's paused clock).
#[derive(Debug, Default)]
pub struct ScriptedSession {
    responses: HashMap<(String, String), Response>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `command` on `address` with `stdout` and exit status 0.
    pub fn respond(mut self, address: &str, command: &str, stdout: &str) -> Self {
        self.responses.insert(
            (address.to_string(), command.to_string()),
            Ok(RawOutput::from_stdout(stdout)),
        );
        self
    }

    /// Answer `command` on `address` with `error`.
    pub fn fail(mut self, address: &str, command: &str, error: ExecutionError) -> Self {
        self.responses
            .insert((address.to_string(), command.to_string()), Err(error));
        self
    }

    /// Delay every answer from `address` by `delay`.
    pub fn delay(mut self, address: &str, delay: Duration) -> Self {
        self.delays.insert(address.to_string(), delay);
        self
    }

    /// Every `(address, command)` pair run so far, in call order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn lookup(&self, address: &str, command: &str) -> Response {
        self.responses
            .get(&(address.to_string(), command.to_string()))
            .cloned()
            .unwrap_or_else(|| {
                Err(ExecutionError::CommandFailed {
                    command: command.to_string(),
                    code: Some(127),
                    stderr: format!("sh: 1: {command}: not found"),
                })
            })
    }
}

#[async_trait]
impl RemoteSession for ScriptedSession {
    async fn run(
        &self,
        target: &ServerTarget,
        command: &str,
        timeout: Duration,
    ) -> Result<RawOutput, ExecutionError> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((target.address.clone(), command.to_string()));

        let delay = self.delays.get(&target.address).copied();
        let answer = async {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            self.lookup(&target.address, command)
        };

        tokio::time::timeout(timeout, answer)
            .await
            .unwrap_or(Err(ExecutionError::Timeout(timeout)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_response() {
        let session = ScriptedSession::new().respond("gpu1", "hostname", "gpu1\n");
        let target = ServerTarget::new("gpu1", "alice");

        let out = session
            .run(&target, "hostname", Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(out.stdout, "gpu1\n");
        assert_eq!(
            session.calls(),
            vec![("gpu1".to_string(), "hostname".to_string())]
        );
    }

    #[tokio::test]
    async fn test_unscripted_command_fails() {
        let session = ScriptedSession::new();
        let target = ServerTarget::new("gpu1", "alice");
        let err = session
            .run(&target, "nvidia-smi", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::CommandFailed {
                code: Some(127),
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_counts_against_timeout() {
        let session = ScriptedSession::new()
            .respond("slow", "true", "")
            .delay("slow", Duration::from_secs(60));
        let target = ServerTarget::new("slow", "alice");

        let err = session
            .run(&target, "true", Duration::from_secs(2))
            .await
            .unwrap_err();
        assert_eq!(err, ExecutionError::Timeout(Duration::from_secs(2)));

        let out = session.run(&target, "true", Duration::from_secs(120)).await;
        assert!(out.is_ok());
    }
}
