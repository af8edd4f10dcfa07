// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use crate::client::TreeClient;
use crate::node::{Acl, NodeRecord, NodeStat};
use crate::{Error, Result};
use diagnostics::log_warn;

/// Stat, ACLs and data of one node, all from the same node version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSnapshot {
    pub stat: NodeStat,
    pub acls: Vec<Acl>,
    pub data: Option<Vec<u8>>,
}

impl NodeSnapshot {
    #[must_use]
    pub fn into_record(self, path: &str) -> NodeRecord {
        NodeRecord {
            path: path.to_string(),
            stat: self.stat,
            data: self.data,
            acls: self.acls,
        }
    }
}

/// Reads a node's ACL and payload so that both describe one version
///
/// The ACL and the data come back from two separate round trips. When the
/// stats of the two replies differ the node changed in between, and both reads
/// are repeated, up to `num_retries` attempts in total.
pub struct ConsistentNodeReader<'a, C: TreeClient + ?Sized> {
    client: &'a C,
    num_retries: u32,
}

impl<'a, C: TreeClient + ?Sized> ConsistentNodeReader<'a, C> {
    #[must_use]
    pub fn new(client: &'a C, num_retries: u32) -> Self {
        Self {
            client,
            num_retries: num_retries.max(1),
        }
    }

    /// Read one node
    ///
    /// # Errors
    /// - [`Error::Client`] with `NoNode` if the node is gone; callers walking
    ///   the tree treat that as recoverable
    /// - [`Error::Inconsistent`] if every attempt saw the node change between
    ///   the two reads
    pub fn read(&self, path: &str) -> Result<NodeSnapshot> {
        for attempt in 1..=self.num_retries {
            let (acls, stat) = self.client.get_acl(path)?;
            if stat.data_length <= 0 {
                return Ok(NodeSnapshot {
                    stat,
                    acls,
                    data: None,
                });
            }

            let (data, data_stat) = self.client.get_data(path)?;
            if stat == data_stat {
                return Ok(NodeSnapshot {
                    stat,
                    acls,
                    data: Some(data),
                });
            }

            if attempt < self.num_retries {
                log_warn!(
                    "Node {path} changed between reads, retrying ({attempt}/{limit})",
                    path: path,
                    attempt: attempt,
                    limit: self.num_retries
                );
            }
        }

        Err(Error::Inconsistent {
            path: path.to_string(),
            attempts: self.num_retries,
        })
    }
}
