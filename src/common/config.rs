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

/// Application configuration constants
pub struct AppConfig;

impl AppConfig {
    // Remote execution
    pub const DEFAULT_SSH_TIMEOUT_SECS: u64 = 30;
    pub const DEFAULT_CMD_TIMEOUT_SECS: u64 = 50;
    pub const MAX_CONCURRENT_CONNECTIONS: usize = 64;

    // Server file
    pub const DEFAULT_SERVER_FILE: &'static str = "servers.txt";
    pub const MAX_SERVER_FILE_BYTES: u64 = 10 * 1024 * 1024; // 10MB max
    pub const MAX_SERVERS: usize = 1000;
}

/// Environment-specific configuration
pub struct EnvConfig;

impl EnvConfig {
    pub fn max_concurrent_connections(total_hosts: usize) -> usize {
        std::cmp::min(total_hosts, AppConfig::MAX_CONCURRENT_CONNECTIONS).max(1)
    }

    /// `servers.txt` next to the running executable, falling back to the
    /// working directory when the executable path is unknown.
    pub fn default_server_file() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.canonicalize().ok())
            .and_then(|exe| exe.parent().map(|dir| dir.join(AppConfig::DEFAULT_SERVER_FILE)))
            .unwrap_or_else(|| PathBuf::from(AppConfig::DEFAULT_SERVER_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_concurrent_connections() {
        assert_eq!(EnvConfig::max_concurrent_connections(0), 1);
        assert_eq!(EnvConfig::max_concurrent_connections(5), 5);
        assert_eq!(
            EnvConfig::max_concurrent_connections(500),
            AppConfig::MAX_CONCURRENT_CONNECTIONS
        );
    }

    #[test]
    fn test_default_server_file_name() {
        let path = EnvConfig::default_server_file();
        assert_eq!(
            path.file_name().and_then(|n| n.to_str()),
            Some(AppConfig::DEFAULT_SERVER_FILE)
        );
    }
}
