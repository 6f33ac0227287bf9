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
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use super::table;
use crate::error::{ExecutionError, ServerFailure};
use crate::identity::IdentityResolver;
use crate::parsing::processes::GpuProcess;
use crate::parsing::{assign_owners, distinct_pids, parse_inventory, parse_owners, parse_process_list};
use crate::remote::commands::{owner_query, INVENTORY_QUERY, PROCESS_QUERY};
use crate::remote::RemoteSession;
use crate::types::{GpuUsage, ServerReport, ServerTarget};

/// Collects the usage table of a single server.
///
/// The deadline starts when collection starts and covers every command
/// run for the server. Identity lookups get whatever budget is left and
/// never fail the report.
#[derive(Clone)]
pub(crate) struct ServerCollector {
    pub session: Arc<dyn RemoteSession>,
    pub identity: Option<Arc<IdentityResolver>>,
    pub owner_filter: Option<String>,
    pub timeout: Duration,
}

impl ServerCollector {
    pub async fn collect(&self, target: ServerTarget) -> ServerReport {
        let deadline = Instant::now() + self.timeout;

        let mut gpus = match tokio::time::timeout_at(deadline, self.acquire(&target)).await {
            Ok(Ok(gpus)) => gpus,
            Ok(Err(failure)) => {
                warn!(server = %target.address, "{failure}");
                return ServerReport::failed(target, failure);
            }
            Err(_) => {
                warn!(server = %target.address, "Timed out after {:?}", self.timeout);
                return ServerReport::failed(target, ExecutionError::Timeout(self.timeout).into());
            }
        };

        if let Some(user) = &self.owner_filter {
            gpus = table::retain_user(gpus, user);
        }

        if let Some(resolver) = &self.identity {
            let remaining = deadline.saturating_duration_since(Instant::now());
            resolver.enrich(&mut gpus, &target, remaining).await;
        }

        debug!(server = %target.address, gpus = gpus.len(), "Collected usage table");
        ServerReport::ok(target, gpus)
    }

    async fn acquire(&self, target: &ServerTarget) -> Result<Vec<GpuUsage>, ServerFailure> {
        let inventory = self.session.run(target, INVENTORY_QUERY, self.timeout).await?;
        let devices = parse_inventory(&inventory.stdout)?;
        if devices.is_empty() {
            return Ok(Vec::new());
        }

        let listing = self.session.run(target, PROCESS_QUERY, self.timeout).await?;
        let processes = parse_process_list(&listing.stdout)?;
        let owners = self.owners(target, &processes).await?;

        let occupants = assign_owners(&processes, &devices, &owners);
        Ok(table::merge(devices, occupants))
    }

    async fn owners(
        &self,
        target: &ServerTarget,
        processes: &[GpuProcess],
    ) -> Result<HashMap<u32, String>, ServerFailure> {
        let pids = distinct_pids(processes);
        if pids.is_empty() {
            return Ok(HashMap::new());
        }

        match self.session.run(target, &owner_query(&pids), self.timeout).await {
            Ok(out) => Ok(parse_owners(&out.stdout)),
            // ps exits non-zero when none of the pids exist anymore
            Err(ExecutionError::CommandFailed { code, .. }) => {
                warn!(
                    server = %target.address,
                    code = ?code,
                    "Process owner lookup failed, GPU processes may have exited"
                );
                Ok(HashMap::new())
            }
            Err(e) => Err(e.into()),
        }
    }
}
