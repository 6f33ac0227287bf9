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

//! Fleet-wide collection.
//!
//! [`Fleet::gather`] runs one collection unit per server, at most
//! `max_in_flight` at a time, and returns one [`ServerReport`] per target in
//! the order the targets were given. A failing or hanging server only
//! affects its own report.

mod server;
pub mod table;

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tracing::{debug, error};

use crate::common::config::EnvConfig;
use crate::error::{FailureKind, ServerFailure};
use crate::identity::{IdentityResolver, IdentitySource};
use crate::remote::RemoteSession;
use crate::types::{FleetReport, ServerReport, ServerTarget};
use server::ServerCollector;

/// Per-invocation options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GatherOptions {
    /// Show used GPUs as well as free ones. Display only; the usage table
    /// is always complete.
    pub list_all: bool,
    /// Keep only GPUs used by `effective_self_name`.
    pub mine_only: bool,
    /// Look up real names of occupants.
    pub resolve_identity: bool,
    pub effective_self_name: String,
    /// Keep only GPUs used by this user. Ignored when `mine_only` is set.
    pub user_filter: Option<String>,
}

impl GatherOptions {
    /// The username GPUs are narrowed to, if any.
    pub fn owner_filter(&self) -> Option<&str> {
        if self.mine_only {
            Some(&self.effective_self_name)
        } else {
            self.user_filter.as_deref()
        }
    }
}

/// Queries a set of servers through a [`RemoteSession`].
pub struct Fleet {
    session: Arc<dyn RemoteSession>,
    identity_source: IdentitySource,
    max_in_flight: Option<usize>,
}

impl Fleet {
    pub fn new(session: Arc<dyn RemoteSession>) -> Self {
        Self {
            session,
            identity_source: IdentitySource::default(),
            max_in_flight: None,
        }
    }

    pub fn with_identity_source(mut self, source: IdentitySource) -> Self {
        self.identity_source = source;
        self
    }

    /// Limit the number of servers queried at the same time.
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = Some(max_in_flight.max(1));
        self
    }

    /// Collect a report for every target.
    ///
    /// `timeout` is the deadline of each server, counted from the moment
    /// that server's collection starts.
    pub async fn gather(
        &self,
        targets: &[ServerTarget],
        options: &GatherOptions,
        timeout: Duration,
    ) -> FleetReport {
        if targets.is_empty() {
            return Vec::new();
        }

        let max_in_flight = self
            .max_in_flight
            .unwrap_or_else(|| EnvConfig::max_concurrent_connections(targets.len()));
        let semaphore = Arc::new(Semaphore::new(max_in_flight));
        debug!(servers = targets.len(), max_in_flight, "Gathering GPU usage");

        let collector = ServerCollector {
            session: self.session.clone(),
            identity: options.resolve_identity.then(|| {
                Arc::new(IdentityResolver::new(
                    self.session.clone(),
                    self.identity_source,
                ))
            }),
            owner_filter: options.owner_filter().map(str::to_string),
            timeout,
        };

        let mut units = FuturesUnordered::new();
        for (index, target) in targets.iter().enumerate() {
            let collector = collector.clone();
            let semaphore = semaphore.clone();
            let target = target.clone();

            let handle = tokio::spawn(async move {
                // The semaphore is never closed, so acquiring only waits
                let _permit = semaphore.acquire_owned().await.ok();
                collector.collect(target).await
            });
            units.push(async move { (index, handle.await) });
        }

        // One slot per target, written exactly once by its own unit
        let mut slots: Vec<Option<ServerReport>> = (0..targets.len()).map(|_| None).collect();
        while let Some((index, joined)) = units.next().await {
            let report = joined.unwrap_or_else(|e| {
                error!(server = %targets[index].address, "Collection task failed: {e}");
                ServerReport::failed(
                    targets[index].clone(),
                    ServerFailure::new(FailureKind::Internal, format!("Collection task failed: {e}")),
                )
            });
            slots[index] = Some(report);
        }

        slots
            .into_iter()
            .zip(targets)
            .map(|(slot, target)| {
                slot.unwrap_or_else(|| {
                    ServerReport::failed(
                        target.clone(),
                        ServerFailure::new(FailureKind::Internal, "No response received"),
                    )
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_filter() {
        let mut options = GatherOptions {
            effective_self_name: "alice".to_string(),
            ..Default::default()
        };
        assert_eq!(options.owner_filter(), None);

        options.user_filter = Some("bob".to_string());
        assert_eq!(options.owner_filter(), Some("bob"));

        options.mine_only = true;
        assert_eq!(options.owner_filter(), Some("alice"));
    }
}
