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

//! Error types for fleet-smi.
//!
//! Errors are layered the same way failures are contained at runtime:
//!
//! - [`ExecutionError`] and [`ParseError`] describe why acquiring one
//!   server's data failed. They are folded into a [`ServerFailure`] and
//!   stored in that server's report, never raised to the caller.
//! - [`ResolutionError`] describes a failed identity lookup. It is softer
//!   still and only costs the occupant its display name.
//! - [`enum@Error`] covers configuration problems (server file, empty fleet)
//!   and is the only error surfaced to `main`.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Failure of a single remote command invocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// The remote session could not be established: unreachable host,
    /// rejected key, DNS failure, or the ssh client itself failed to start.
    #[error("Connection to {target} failed: {message}")]
    ConnectionFailed { target: String, message: String },

    /// The command did not finish before its deadline and was killed.
    #[error("Command timed out after {0:?}")]
    Timeout(Duration),

    /// The command ran but exited with a non-zero status.
    #[error("Command failed: '{command}' (code: {code:?}) stderr: {stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
}

/// Failure to interpret command output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// `line` is 1-based.
    #[error("Malformed line {line}: {reason} (input: '{content}')")]
    MalformedLine {
        line: usize,
        content: String,
        reason: String,
    },
}

/// Failure to map a username to a display name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("No identity record found")]
    NotFound,
    #[error("Identity lookup unavailable: {0}")]
    Unavailable(String),
}

/// Category of a per-server failure, as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ConnectionFailed,
    Timeout,
    CommandFailed,
    MalformedOutput,
    /// The collection task for the server aborted unexpectedly.
    Internal,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::ConnectionFailed => write!(f, "Connection failed"),
            FailureKind::Timeout => write!(f, "Timeout"),
            FailureKind::CommandFailed => write!(f, "Command failed"),
            FailureKind::MalformedOutput => write!(f, "Malformed output"),
            FailureKind::Internal => write!(f, "Internal error"),
        }
    }
}

/// Contained error stored in a server's report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{kind}: {message}")]
pub struct ServerFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl ServerFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<ExecutionError> for ServerFailure {
    fn from(err: ExecutionError) -> Self {
        let kind = match &err {
            ExecutionError::ConnectionFailed { .. } => FailureKind::ConnectionFailed,
            ExecutionError::Timeout(_) => FailureKind::Timeout,
            ExecutionError::CommandFailed { .. } => FailureKind::CommandFailed,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<ParseError> for ServerFailure {
    fn from(err: ParseError) -> Self {
        Self::new(FailureKind::MalformedOutput, err.to_string())
    }
}

/// The main error type for fleet-smi configuration and startup.
#[derive(Debug, Error)]
pub enum Error {
    /// The server file could not be read.
    #[error("Could not open server file {}: {source}", .path.display())]
    ServerFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The server file exists but is unusable (too large, not a file).
    #[error("Invalid server file {}: {reason}", .path.display())]
    InvalidServerFile { path: PathBuf, reason: String },

    /// Neither the command line nor the server file named any server.
    #[error(
        "No GPU servers to connect to specified.\nPut addresses in the server file or specify them manually as an argument"
    )]
    NoServers,

    /// `--ssh-user` is not a usable login name.
    #[error("Invalid ssh user '{0}'")]
    InvalidSshUser(String),

    /// Writing the report failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Serializing the JSON report failed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for fleet-smi operations.
pub type Result<T> = std::result::Result<T, Error>;
