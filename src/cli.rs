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

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::common::config::{AppConfig, EnvConfig};
use crate::common::hostfile::load_servers;
use crate::error::{Error, Result};
use crate::fleet::GatherOptions;
use crate::identity::IdentitySource;
use crate::types::ServerTarget;
use crate::utils::validation::{validate_host, validate_username};

/// Check the state of GPU servers.
///
/// Works best with an ssh key, so a password does not have to be entered
/// for each connection.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Servers to probe. Read from the server file when empty.
    pub servers: Vec<String>,
    /// File with addresses of servers to check.
    #[arg(long)]
    pub server_file: Option<PathBuf>,
    /// Username to use to connect with SSH.
    #[arg(short, long)]
    pub ssh_user: Option<String>,
    /// Timeout in seconds after which SSH stops trying to connect.
    #[arg(long, default_value_t = AppConfig::DEFAULT_SSH_TIMEOUT_SECS)]
    pub ssh_timeout: u64,
    /// Timeout in seconds after which querying a server is abandoned.
    #[arg(long, default_value_t = AppConfig::DEFAULT_CMD_TIMEOUT_SECS)]
    pub cmd_timeout: u64,
    /// Show used GPUs.
    #[arg(short, long)]
    pub list: bool,
    /// Show only GPUs used by the current user.
    #[arg(short, long)]
    pub me: bool,
    /// Show only GPUs used by a user.
    #[arg(short, long)]
    pub user: Option<String>,
    /// Attempt to resolve user names to real names.
    #[arg(short, long)]
    pub finger: bool,
    /// Remote facility used to resolve real names.
    #[arg(long, value_enum, default_value_t = IdentitySource::Getent)]
    pub identity_source: IdentitySource,
    /// Maximum number of servers queried at the same time.
    #[arg(long)]
    pub max_connections: Option<usize>,
    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
    /// Be verbose.
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Servers from the command line, or from the server file.
    pub fn server_addresses(&self) -> Result<Vec<String>> {
        let servers = if self.servers.is_empty() {
            let path = self
                .server_file
                .clone()
                .unwrap_or_else(EnvConfig::default_server_file);
            tracing::debug!("Using server file {}", path.display());
            load_servers(&path)?
        } else {
            self.servers
                .iter()
                .filter(|s| {
                    let valid = validate_host(s);
                    if !valid {
                        tracing::warn!("Invalid server address skipped: {s}");
                    }
                    valid
                })
                .cloned()
                .collect()
        };

        if servers.is_empty() {
            return Err(Error::NoServers);
        }
        Ok(servers)
    }

    /// Name GPUs are attributed to for `--me`: the ssh user if given,
    /// otherwise the local user.
    pub fn effective_self_name(&self) -> String {
        self.ssh_user.clone().unwrap_or_else(whoami::username)
    }

    pub fn targets(&self, addresses: Vec<String>) -> Result<Vec<ServerTarget>> {
        if let Some(user) = &self.ssh_user {
            if !validate_username(user) {
                return Err(Error::InvalidSshUser(user.clone()));
            }
        }
        let local_user = whoami::username();
        Ok(addresses
            .into_iter()
            .map(|address| match &self.ssh_user {
                Some(user) => ServerTarget::with_user(address, user.clone()),
                None => ServerTarget::new(address, local_user.clone()),
            })
            .collect())
    }

    pub fn gather_options(&self) -> GatherOptions {
        GatherOptions {
            // Filtering by user or resolving names only makes sense with the full list
            list_all: self.list || self.me || self.user.is_some() || self.finger,
            mine_only: self.me,
            resolve_identity: self.finger,
            effective_self_name: self.effective_self_name(),
            user_filter: self.user.clone(),
        }
    }

    pub fn ssh_timeout(&self) -> Duration {
        Duration::from_secs(self.ssh_timeout)
    }

    pub fn cmd_timeout(&self) -> Duration {
        Duration::from_secs(self.cmd_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["fleet-smi", "gpu1", "gpu2"]);
        assert_eq!(cli.servers, vec!["gpu1", "gpu2"]);
        assert_eq!(cli.ssh_timeout(), Duration::from_secs(30));
        assert_eq!(cli.cmd_timeout(), Duration::from_secs(50));
        assert_eq!(cli.identity_source, IdentitySource::Getent);

        let options = cli.gather_options();
        assert!(!options.list_all);
        assert!(!options.mine_only);
        assert!(!options.resolve_identity);
    }

    #[test]
    fn test_user_and_finger_imply_list() {
        let cli = Cli::parse_from(["fleet-smi", "-u", "bob", "gpu1"]);
        let options = cli.gather_options();
        assert!(options.list_all);
        assert_eq!(options.owner_filter(), Some("bob"));

        let cli = Cli::parse_from(["fleet-smi", "-f", "--identity-source", "finger", "gpu1"]);
        assert!(cli.gather_options().list_all);
        assert!(cli.gather_options().resolve_identity);
        assert_eq!(cli.identity_source, IdentitySource::Finger);
    }

    #[test]
    fn test_me_uses_ssh_user() {
        let cli = Cli::parse_from(["fleet-smi", "-m", "-s", "carol", "gpu1"]);
        let options = cli.gather_options();
        assert!(options.mine_only);
        assert_eq!(options.owner_filter(), Some("carol"));

        let targets = cli.targets(vec!["gpu1".to_string()]).unwrap();
        assert_eq!(targets[0].ssh_destination(), "carol@gpu1");
    }

    #[test]
    fn test_targets_without_ssh_user() {
        let cli = Cli::parse_from(["fleet-smi", "gpu1"]);
        let targets = cli.targets(vec!["gpu1".to_string()]).unwrap();
        assert_eq!(targets[0].ssh_destination(), "gpu1");
        assert!(!targets[0].user_override);
    }

    #[test]
    fn test_ssh_user_option_injection_is_rejected() {
        let cli = Cli::parse_from([
            "fleet-smi",
            "--ssh-user=-oProxyCommand=touch /tmp/x",
            "gpu1",
        ]);
        let err = cli.targets(vec!["gpu1".to_string()]).unwrap_err();
        assert!(matches!(err, Error::InvalidSshUser(ref user) if user.starts_with("-o")));

        let cli = Cli::parse_from(["fleet-smi", "-s", "bob;reboot", "gpu1"]);
        assert!(cli.targets(vec!["gpu1".to_string()]).is_err());
    }

    #[test]
    fn test_invalid_addresses_are_dropped() {
        let cli = Cli::parse_from(["fleet-smi", "gpu1", "gpu2;reboot"]);
        assert_eq!(cli.server_addresses().unwrap(), vec!["gpu1"]);

        assert!(Cli::try_parse_from(["fleet-smi", "-oProxyCommand=x"]).is_err());
    }
}
