// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use crate::client::{ClientError, ClientResult, CreateMode, TreeClient};
use crate::node::{Acl, NodeStat};
use crate::path::{self, ROOT};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Data and ACLs of one node as seen by [`MemoryTree::entries`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Payload; a node without data reads as empty
    pub data: Vec<u8>,
    pub acls: Vec<Acl>,
    pub ephemeral_owner: i64,
}

#[derive(Debug, Clone)]
struct MemoryNode {
    data: Option<Vec<u8>>,
    acls: Vec<Acl>,
    stat: NodeStat,
    children: BTreeSet<String>,
}

#[derive(Debug)]
struct State {
    nodes: BTreeMap<String, MemoryNode>,
    last_zxid: i64,
    session_id: i64,
}

impl Default for State {
    fn default() -> Self {
        let root = MemoryNode {
            data: None,
            acls: vec![Acl::open()],
            stat: NodeStat::default(),
            children: BTreeSet::new(),
        };
        Self {
            nodes: BTreeMap::from([(ROOT.to_string(), root)]),
            last_zxid: 0,
            session_id: 1,
        }
    }
}

/// In-memory tree service for tests and dry runs
///
/// Keeps the stat bookkeeping the engines rely on: every mutation takes a new
/// zxid, data/ACL/children changes bump their own version counter, and nodes
/// created in [`CreateMode::Ephemeral`] are owned by this tree's session id.
/// Clones share the same tree.
#[derive(Debug, Clone, Default)]
pub struct MemoryTree(Arc<Mutex<State>>);

impl MemoryTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `session_id` as the owner of ephemeral nodes created from now on
    #[must_use]
    pub fn with_session_id(self, session_id: i64) -> Self {
        self.state().session_id = session_id;
        self
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Delete a node and everything beneath it
    pub fn remove(&self, path: &str) -> ClientResult<()> {
        let mut state = self.state();
        if path == ROOT {
            return Err(ClientError::remote(path, "the root node cannot be removed"));
        }
        if !state.nodes.contains_key(path) {
            return Err(ClientError::no_node(path));
        }

        let mut pending = vec![path.to_string()];
        while let Some(current) = pending.pop() {
            if let Some(node) = state.nodes.remove(&current) {
                pending.extend(
                    node.children
                        .iter()
                        .map(|name| path::child_path(&current, name)),
                );
            }
        }

        let zxid = state.next_zxid();
        let name = basename(path);
        if let Some(parent) = state.nodes.get_mut(path::parent_of(path)) {
            parent.children.remove(name);
            parent.stat.cversion += 1;
            parent.stat.pzxid = zxid;
            parent.stat.num_children -= 1;
        }
        Ok(())
    }

    /// Every node in the tree keyed by path, the root included
    #[must_use]
    pub fn entries(&self) -> BTreeMap<String, TreeEntry> {
        self.state()
            .nodes
            .iter()
            .map(|(path, node)| {
                (
                    path.clone(),
                    TreeEntry {
                        data: node.data.clone().unwrap_or_default(),
                        acls: node.acls.clone(),
                        ephemeral_owner: node.stat.ephemeral_owner,
                    },
                )
            })
            .collect()
    }

    /// Stat of one node, for assertions about what a restore touched
    #[must_use]
    pub fn stat(&self, path: &str) -> Option<NodeStat> {
        self.state().nodes.get(path).map(|node| node.stat)
    }
}

impl State {
    fn next_zxid(&mut self) -> i64 {
        self.last_zxid += 1;
        self.last_zxid
    }

    fn node(&self, path: &str) -> ClientResult<&MemoryNode> {
        self.nodes.get(path).ok_or_else(|| ClientError::no_node(path))
    }

    fn node_mut(&mut self, path: &str) -> ClientResult<&mut MemoryNode> {
        self.nodes
            .get_mut(path)
            .ok_or_else(|| ClientError::no_node(path))
    }
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn data_length(data: Option<&[u8]>) -> i32 {
    data.map_or(0, |d| i32::try_from(d.len()).unwrap_or(i32::MAX))
}

fn check_version(path: &str, expected: Option<i32>, actual: i32) -> ClientResult<()> {
    match expected {
        Some(version) if version != actual => Err(ClientError::bad_version(path)),
        _ => Ok(()),
    }
}

impl TreeClient for MemoryTree {
    fn get_acl(&self, path: &str) -> ClientResult<(Vec<Acl>, NodeStat)> {
        let state = self.state();
        let node = state.node(path)?;
        Ok((node.acls.clone(), node.stat))
    }

    fn get_data(&self, path: &str) -> ClientResult<(Vec<u8>, NodeStat)> {
        let state = self.state();
        let node = state.node(path)?;
        Ok((node.data.clone().unwrap_or_default(), node.stat))
    }

    fn get_children(&self, path: &str) -> ClientResult<Vec<String>> {
        let state = self.state();
        let node = state.node(path)?;
        Ok(node.children.iter().cloned().collect())
    }

    fn create(
        &self,
        path: &str,
        data: Option<&[u8]>,
        acls: &[Acl],
        mode: CreateMode,
    ) -> ClientResult<()> {
        path::validate_path(path).map_err(|e| ClientError::remote(path, e))?;
        let mut state = self.state();
        if state.nodes.contains_key(path) {
            return Err(ClientError::node_exists(path));
        }
        let parent_path = path::parent_of(path);
        match state.nodes.get(parent_path) {
            None => return Err(ClientError::no_node(path)),
            Some(parent) if parent.stat.is_ephemeral() => {
                return Err(ClientError::remote(
                    path,
                    "ephemeral nodes may not have children",
                ));
            }
            Some(_) => {}
        }

        let zxid = state.next_zxid();
        let now = chrono::Utc::now().timestamp_millis();
        let ephemeral_owner = match mode {
            CreateMode::Persistent => 0,
            CreateMode::Ephemeral => state.session_id,
        };
        let node = MemoryNode {
            data: data.map(<[u8]>::to_vec),
            acls: acls.to_vec(),
            stat: NodeStat {
                czxid: zxid,
                mzxid: zxid,
                pzxid: zxid,
                ctime: now,
                mtime: now,
                version: 0,
                cversion: 0,
                aversion: 0,
                ephemeral_owner,
                data_length: data_length(data),
                num_children: 0,
            },
            children: BTreeSet::new(),
        };
        state.nodes.insert(path.to_string(), node);

        let parent = state.node_mut(parent_path)?;
        parent.children.insert(basename(path).to_string());
        parent.stat.cversion += 1;
        parent.stat.pzxid = zxid;
        parent.stat.num_children += 1;
        Ok(())
    }

    fn set_acl(&self, path: &str, acls: &[Acl], version: Option<i32>) -> ClientResult<()> {
        let mut state = self.state();
        let node = state.node_mut(path)?;
        check_version(path, version, node.stat.aversion)?;
        node.acls = acls.to_vec();
        node.stat.aversion += 1;
        Ok(())
    }

    fn set_data(&self, path: &str, data: Option<&[u8]>, version: Option<i32>) -> ClientResult<()> {
        let mut state = self.state();
        check_version(path, version, state.node(path)?.stat.version)?;
        let zxid = state.next_zxid();
        let node = state.node_mut(path)?;
        node.data = data.map(<[u8]>::to_vec);
        node.stat.version += 1;
        node.stat.mzxid = zxid;
        node.stat.mtime = chrono::Utc::now().timestamp_millis();
        node.stat.data_length = data_length(data);
        Ok(())
    }

    fn exists(&self, path: &str) -> ClientResult<bool> {
        Ok(self.state().nodes.contains_key(path))
    }
}
