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

// Input validation for values interpolated into remote command lines

/// Validates a username is safe to pass to `getent`/`finger` on a remote host.
/// Accepts the portable POSIX login name charset.
pub fn validate_username(username: &str) -> bool {
    if username.is_empty() || username.len() > 64 || username.starts_with('-') {
        return false;
    }
    username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "._-".contains(c))
}

/// Validates a server address from the command line or the server file.
/// Accepts hostnames, IPv4/IPv6 literals and ssh-style `user@host`.
pub fn validate_host(host: &str) -> bool {
    if host.is_empty() || host.starts_with('-') {
        return false;
    }
    host.chars()
        .all(|c| c.is_ascii() && (c.is_alphanumeric() || ".-:_@[]".contains(c)))
}
