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

// Loading server addresses from a file: one per line, `#` starts a comment.

use std::path::Path;

use tracing::warn;

use super::config::AppConfig;
use crate::error::{Error, Result};
use crate::utils::validation::validate_host;

/// Read server addresses from `path`, preserving file order.
///
/// Blank lines and comments are ignored; entries that are not plausible
/// host names are skipped with a warning. At most
/// [`AppConfig::MAX_SERVERS`] entries are kept.
pub fn load_servers(path: &Path) -> Result<Vec<String>> {
    let server_file_error = |source| Error::ServerFile {
        path: path.to_path_buf(),
        source,
    };

    let metadata = std::fs::metadata(path).map_err(server_file_error)?;
    if !metadata.is_file() {
        return Err(Error::InvalidServerFile {
            path: path.to_path_buf(),
            reason: "not a regular file".to_string(),
        });
    }
    if metadata.len() > AppConfig::MAX_SERVER_FILE_BYTES {
        return Err(Error::InvalidServerFile {
            path: path.to_path_buf(),
            reason: format!(
                "too large: {} bytes (max: {} bytes)",
                metadata.len(),
                AppConfig::MAX_SERVER_FILE_BYTES
            ),
        });
    }

    let content = std::fs::read_to_string(path).map_err(server_file_error)?;
    Ok(parse_servers(&content))
}

/// Parse server file contents.
pub fn parse_servers(content: &str) -> Vec<String> {
    let mut servers = Vec::new();

    for entry in content.lines().map(strip_comment).filter(|s| !s.is_empty()) {
        if !validate_host(entry) {
            warn!("Invalid server address skipped: {entry}");
            continue;
        }
        if servers.len() == AppConfig::MAX_SERVERS {
            warn!(
                "Server file contains more than {} servers, truncating",
                AppConfig::MAX_SERVERS
            );
            break;
        }
        servers.push(entry.to_string());
    }

    servers
}

fn strip_comment(line: &str) -> &str {
    line.split('#').next().unwrap_or_default().trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_servers() {
        let content = "# lab machines\ngpu1.example.org\n\n  gpu2  \n10.0.0.7 # rack 3\nbad host;\n";
        assert_eq!(
            parse_servers(content),
            vec!["gpu1.example.org", "gpu2", "10.0.0.7"]
        );
    }

    #[test]
    fn test_parse_servers_truncates() {
        let content: String = (0..AppConfig::MAX_SERVERS + 5)
            .map(|i| format!("node{i}\n"))
            .collect();
        let servers = parse_servers(&content);
        assert_eq!(servers.len(), AppConfig::MAX_SERVERS);
        assert_eq!(servers[0], "node0");
    }

    #[test]
    fn test_load_servers_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "gpu1\ngpu2").unwrap();
        let servers = load_servers(file.path()).unwrap();
        assert_eq!(servers, vec!["gpu1", "gpu2"]);
    }

    #[test]
    fn test_load_servers_missing_file() {
        let err = load_servers(Path::new("/nonexistent/servers.txt")).unwrap_err();
        assert!(matches!(err, Error::ServerFile { .. }));
    }

    #[test]
    fn test_load_servers_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_servers(dir.path()).unwrap_err();
        assert!(matches!(err, Error::InvalidServerFile { .. }));
    }
}
