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

//! Username to display-name resolution.
//!
//! Lookups run on the server that reported the usernames, since account
//! databases differ between hosts. Every failure is soft: the occupant
//! simply keeps its bare username.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::error::{ExecutionError, ResolutionError};
use crate::remote::RemoteSession;
use crate::types::{GpuUsage, ServerTarget};
use crate::utils::validation::validate_username;

/// `getent` exits with 2 when the key is not in the database.
const GETENT_NOT_FOUND: i32 = 2;

static FINGER_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Name:\s*(.*\S)").expect("Failed to compile finger name regex")
});

/// Remote facility used to look up real names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum IdentitySource {
    /// `getent passwd <user>`, first GECOS sub-field.
    #[default]
    Getent,
    /// `finger -m <user>`, the `Name:` field.
    Finger,
}

impl IdentitySource {
    pub fn command(&self, username: &str) -> String {
        match self {
            IdentitySource::Getent => format!("getent passwd {username}"),
            IdentitySource::Finger => format!("finger -m {username}"),
        }
    }

    /// Extract the display name from a successful lookup.
    pub fn parse(&self, stdout: &str) -> Result<String, ResolutionError> {
        let name = match self {
            IdentitySource::Getent => stdout
                .lines()
                .find(|l| !l.trim().is_empty())
                .and_then(|l| l.split(':').nth(4))
                .and_then(|gecos| gecos.split(',').next())
                .map(|name| name.trim().to_string()),
            IdentitySource::Finger => {
                if stdout.contains("no such user") {
                    return Err(ResolutionError::NotFound);
                }
                FINGER_NAME
                    .captures(stdout)
                    .and_then(|cap| cap.get(1))
                    .map(|m| m.as_str().trim().to_string())
            }
        };

        match name {
            Some(name) if !name.is_empty() => Ok(name),
            _ => Err(ResolutionError::NotFound),
        }
    }

    fn classify_failure(&self, err: ExecutionError) -> ResolutionError {
        match (self, &err) {
            (
                IdentitySource::Getent,
                ExecutionError::CommandFailed {
                    code: Some(GETENT_NOT_FOUND),
                    ..
                },
            ) => ResolutionError::NotFound,
            (IdentitySource::Finger, ExecutionError::CommandFailed { stderr, .. })
                if stderr.contains("no such user") =>
            {
                ResolutionError::NotFound
            }
            _ => ResolutionError::Unavailable(err.to_string()),
        }
    }
}

/// Resolves usernames to display names on a given server.
pub struct IdentityResolver {
    session: Arc<dyn RemoteSession>,
    source: IdentitySource,
}

impl IdentityResolver {
    pub fn new(session: Arc<dyn RemoteSession>, source: IdentitySource) -> Self {
        Self { session, source }
    }

    /// Look every username up once, concurrently.
    pub async fn resolve(
        &self,
        usernames: &BTreeSet<String>,
        target: &ServerTarget,
        timeout: Duration,
    ) -> HashMap<String, Result<String, ResolutionError>> {
        let lookups = usernames.iter().map(|username| async move {
            let result = self.lookup(username, target, timeout).await;
            (username.clone(), result)
        });
        join_all(lookups).await.into_iter().collect()
    }

    async fn lookup(
        &self,
        username: &str,
        target: &ServerTarget,
        timeout: Duration,
    ) -> Result<String, ResolutionError> {
        if !validate_username(username) {
            debug!(username, "Refusing to look up unusual username");
            return Err(ResolutionError::NotFound);
        }

        match self
            .session
            .run(target, &self.source.command(username), timeout)
            .await
        {
            Ok(out) => self.source.parse(&out.stdout),
            Err(err) => Err(self.source.classify_failure(err)),
        }
    }

    /// Fill in `display_name` for every occupant whose lookup succeeds.
    pub async fn enrich(&self, gpus: &mut [GpuUsage], target: &ServerTarget, timeout: Duration) {
        let usernames: BTreeSet<String> = gpus
            .iter()
            .flat_map(|gpu| gpu.occupants.iter().map(|o| o.username.clone()))
            .collect();
        if usernames.is_empty() {
            return;
        }

        let names = self.resolve(&usernames, target, timeout).await;
        for (username, result) in &names {
            if let Err(e) = result {
                warn!(server = %target.address, username, "Could not resolve real name: {e}");
            }
        }

        for occupant in gpus.iter_mut().flat_map(|gpu| gpu.occupants.iter_mut()) {
            if let Some(Ok(name)) = names.get(&occupant.username) {
                occupant.display_name = Some(name.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::ScriptedSession;
    use crate::types::{GpuDevice, Occupant};

    fn target() -> ServerTarget {
        ServerTarget::new("gpu1", "alice")
    }

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_getent_parse() {
        let source = IdentitySource::Getent;
        assert_eq!(
            source.parse("alice:x:1000:1000:Alice Liddell,Room 12,,:/home/alice:/bin/bash\n"),
            Ok("Alice Liddell".to_string())
        );
        assert_eq!(
            source.parse("svc:x:999:999::/var/lib/svc:/usr/sbin/nologin\n"),
            Err(ResolutionError::NotFound)
        );
        assert_eq!(source.parse(""), Err(ResolutionError::NotFound));
    }

    #[test]
    fn test_finger_parse() {
        let source = IdentitySource::Finger;
        let out = "Login: bob            \t\t\tName: Bob Builder\nDirectory: /home/bob  \tShell: /bin/zsh\n";
        assert_eq!(source.parse(out), Ok("Bob Builder".to_string()));
        assert_eq!(
            source.parse("finger: carol: no such user.\n"),
            Err(ResolutionError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_resolve_mixed_results() {
        let session = ScriptedSession::new()
            .respond(
                "gpu1",
                "getent passwd alice",
                "alice:x:1000:1000:Alice Liddell:/home/alice:/bin/bash\n",
            )
            .fail(
                "gpu1",
                "getent passwd bob",
                ExecutionError::CommandFailed {
                    command: "getent passwd bob".to_string(),
                    code: Some(2),
                    stderr: String::new(),
                },
            )
            .fail(
                "gpu1",
                "getent passwd carol",
                ExecutionError::ConnectionFailed {
                    target: "gpu1".to_string(),
                    message: "Connection reset by peer".to_string(),
                },
            );
        let resolver = IdentityResolver::new(Arc::new(session), IdentitySource::Getent);

        let names = resolver
            .resolve(&set(&["alice", "bob", "carol"]), &target(), Duration::from_secs(5))
            .await;
        assert_eq!(names["alice"], Ok("Alice Liddell".to_string()));
        assert_eq!(names["bob"], Err(ResolutionError::NotFound));
        assert!(matches!(names["carol"], Err(ResolutionError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_missing_tool_is_unavailable() {
        let resolver = IdentityResolver::new(Arc::new(ScriptedSession::new()), IdentitySource::Finger);
        let names = resolver
            .resolve(&set(&["alice"]), &target(), Duration::from_secs(5))
            .await;
        assert!(matches!(names["alice"], Err(ResolutionError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_suspicious_username_is_not_sent() {
        let session = Arc::new(ScriptedSession::new());
        let resolver = IdentityResolver::new(session.clone(), IdentitySource::Getent);
        let names = resolver
            .resolve(&set(&["x;reboot"]), &target(), Duration::from_secs(5))
            .await;
        assert_eq!(names["x;reboot"], Err(ResolutionError::NotFound));
        assert!(session.calls().is_empty());
    }

    #[tokio::test]
    async fn test_enrich_looks_up_each_user_once() {
        let session = Arc::new(ScriptedSession::new().respond(
            "gpu1",
            "getent passwd alice",
            "alice:x:1000:1000:Alice Liddell:/home/alice:/bin/bash\n",
        ));
        let resolver = IdentityResolver::new(session.clone(), IdentitySource::Getent);

        let device = |index| GpuDevice {
            index,
            uuid: None,
            model: "Tesla T4".to_string(),
        };
        let mut gpus = vec![
            GpuUsage {
                device: device(0),
                occupants: vec![Occupant::new("alice", 1), Occupant::new("bob", 2)],
            },
            GpuUsage {
                device: device(1),
                occupants: vec![Occupant::new("alice", 3)],
            },
        ];

        resolver
            .enrich(&mut gpus, &target(), Duration::from_secs(5))
            .await;

        assert_eq!(gpus[0].occupants[0].display_name.as_deref(), Some("Alice Liddell"));
        assert_eq!(gpus[0].occupants[1].display_name, None);
        assert_eq!(gpus[0].occupants[1].label(), "bob");
        assert_eq!(gpus[1].occupants[0].display_name.as_deref(), Some("Alice Liddell"));
        assert_eq!(session.calls().len(), 2);
    }
}
