// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! The tree service operations the engines depend on

use crate::node::{Acl, NodeStat};
use thiserror::Error;

/// Failure reported by a [`TreeClient`] call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("No such node: {0}")]
    NoNode(String),

    #[error("Node already exists: {0}")]
    NodeExists(String),

    #[error("Version mismatch for node: {0}")]
    BadVersion(String),

    #[error("Remote call failed for {path}: {message}")]
    Remote { path: String, message: String },
}

impl ClientError {
    pub fn no_node<S: AsRef<str>>(path: S) -> Self {
        ClientError::NoNode(path.as_ref().to_string())
    }

    pub fn node_exists<S: AsRef<str>>(path: S) -> Self {
        ClientError::NodeExists(path.as_ref().to_string())
    }

    pub fn bad_version<S: AsRef<str>>(path: S) -> Self {
        ClientError::BadVersion(path.as_ref().to_string())
    }

    pub fn remote<S: AsRef<str>, M: std::fmt::Display>(path: S, message: M) -> Self {
        ClientError::Remote {
            path: path.as_ref().to_string(),
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            ClientError::NoNode(path)
            | ClientError::NodeExists(path)
            | ClientError::BadVersion(path)
            | ClientError::Remote { path, .. } => path,
        }
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;

/// Lifetime of a created node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateMode {
    Persistent,
    Ephemeral,
}

/// A connected session to the tree service
///
/// Every call is a blocking request/response. `version: None` on the set
/// operations means "any version".
pub trait TreeClient {
    /// ACL list and stat of a node
    fn get_acl(&self, path: &str) -> ClientResult<(Vec<Acl>, NodeStat)>;

    /// Payload and stat of a node
    fn get_data(&self, path: &str) -> ClientResult<(Vec<u8>, NodeStat)>;

    /// Child names (not full paths), in no particular order
    fn get_children(&self, path: &str) -> ClientResult<Vec<String>>;

    /// Create a node; fails with [`ClientError::NodeExists`] when the path is taken
    fn create(
        &self,
        path: &str,
        data: Option<&[u8]>,
        acls: &[Acl],
        mode: CreateMode,
    ) -> ClientResult<()>;

    fn set_acl(&self, path: &str, acls: &[Acl], version: Option<i32>) -> ClientResult<()>;

    fn set_data(&self, path: &str, data: Option<&[u8]>, version: Option<i32>) -> ClientResult<()>;

    fn exists(&self, path: &str) -> ClientResult<bool>;
}

impl<T: TreeClient + ?Sized> TreeClient for &T {
    fn get_acl(&self, path: &str) -> ClientResult<(Vec<Acl>, NodeStat)> {
        (**self).get_acl(path)
    }

    fn get_data(&self, path: &str) -> ClientResult<(Vec<u8>, NodeStat)> {
        (**self).get_data(path)
    }

    fn get_children(&self, path: &str) -> ClientResult<Vec<String>> {
        (**self).get_children(path)
    }

    fn create(
        &self,
        path: &str,
        data: Option<&[u8]>,
        acls: &[Acl],
        mode: CreateMode,
    ) -> ClientResult<()> {
        (**self).create(path, data, acls, mode)
    }

    fn set_acl(&self, path: &str, acls: &[Acl], version: Option<i32>) -> ClientResult<()> {
        (**self).set_acl(path, acls, version)
    }

    fn set_data(&self, path: &str, data: Option<&[u8]>, version: Option<i32>) -> ClientResult<()> {
        (**self).set_data(path, data, version)
    }

    fn exists(&self, path: &str) -> ClientResult<bool> {
        (**self).exists(path)
    }
}
