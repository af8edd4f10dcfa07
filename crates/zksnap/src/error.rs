// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for backup and restore runs

use crate::client::ClientError;
use thiserror::Error;

/// Failures that abort a backup or restore
///
/// Recoverable conditions (a node vanishing mid-walk, a conflicting node on
/// restore, an ancestor created concurrently) never surface here; they are
/// logged and counted in the run summaries instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Unable to read consistent data for node {path} after {attempts} attempts")]
    Inconsistent { path: String, attempts: u32 },

    #[error("Malformed backup record {path}: missing required fields {missing:?}")]
    MissingFields {
        path: String,
        missing: Vec<&'static str>,
    },

    #[error("Malformed backup stream: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("Failed to write backup stream: {0}")]
    Encode(#[source] serde_json::Error),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Invalid path pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Invalid node path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn invalid_path<S: AsRef<str>>(path: S, reason: &'static str) -> Self {
        Error::InvalidPath {
            path: path.as_ref().to_string(),
            reason,
        }
    }

    /// The node path this error is about, when there is one
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Error::Inconsistent { path, .. }
            | Error::MissingFields { path, .. }
            | Error::InvalidPath { path, .. } => Some(path.as_str()),
            Error::Client(err) => Some(err.path()),
            _ => None,
        }
    }
}
