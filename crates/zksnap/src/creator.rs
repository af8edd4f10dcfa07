// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use crate::Result;
use crate::client::{ClientError, CreateMode, TreeClient};
use crate::node::Acl;
use crate::path::{self, ROOT};
use diagnostics::{log_debug, log_info};

/// Creates missing ancestors of a node before the node itself is restored
///
/// Placeholders are persistent, carry no data and an open ACL. Losing a
/// creation race to another client is fine: the ancestor exists either way.
pub struct PathCreator<'a, C: TreeClient + ?Sized> {
    client: &'a C,
}

impl<'a, C: TreeClient + ?Sized> PathCreator<'a, C> {
    #[must_use]
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    /// Make sure `path` exists, creating it and any missing ancestors
    ///
    /// The root always exists and is never created.
    pub fn ensure(&self, path: &str) -> Result<()> {
        // Walk up to the deepest existing ancestor, then create downwards.
        let mut missing = Vec::new();
        let mut current = path;
        while current != ROOT && !self.client.exists(current)? {
            missing.push(current);
            current = path::parent_of(current);
        }

        for dir in missing.into_iter().rev() {
            log_info!("Creating path: {path}", path: dir);
            match self
                .client
                .create(dir, None, &[Acl::open()], CreateMode::Persistent)
            {
                Ok(()) => {}
                Err(ClientError::NodeExists(_)) => {
                    log_debug!("Path {path} appeared concurrently", path: dir);
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientResult;
    use crate::memory::MemoryTree;
    use crate::node::NodeStat;
    use std::cell::Cell;

    #[test]
    fn test_creates_every_missing_ancestor() {
        let tree = MemoryTree::new();
        PathCreator::new(&tree).ensure("/a/b/c").expect("ensure");

        let entries = tree.entries();
        for path in ["/a", "/a/b", "/a/b/c"] {
            let entry = &entries[path];
            assert!(entry.data.is_empty());
            assert_eq!(entry.acls, vec![Acl::open()]);
            assert_eq!(entry.ephemeral_owner, 0);
        }
    }

    #[test]
    fn test_existing_path_is_untouched() {
        let tree = MemoryTree::new();
        tree.create("/a", Some(b"keep"), &[], CreateMode::Persistent)
            .expect("create");
        PathCreator::new(&tree).ensure("/a").expect("ensure");
        PathCreator::new(&tree).ensure("/").expect("ensure root");

        assert_eq!(tree.entries()["/a"].data, b"keep");
        assert_eq!(tree.stat("/a").expect("stat").version, 0);
    }

    /// Another client creates every node between our exists() and create()
    struct RacingTree {
        inner: MemoryTree,
        races: Cell<u32>,
    }

    impl TreeClient for RacingTree {
        fn get_acl(&self, path: &str) -> ClientResult<(Vec<Acl>, NodeStat)> {
            self.inner.get_acl(path)
        }

        fn get_data(&self, path: &str) -> ClientResult<(Vec<u8>, NodeStat)> {
            self.inner.get_data(path)
        }

        fn get_children(&self, path: &str) -> ClientResult<Vec<String>> {
            self.inner.get_children(path)
        }

        fn create(
            &self,
            path: &str,
            data: Option<&[u8]>,
            acls: &[Acl],
            mode: CreateMode,
        ) -> ClientResult<()> {
            self.races.set(self.races.get() + 1);
            self.inner
                .create(path, Some(b"theirs"), acls, CreateMode::Persistent)?;
            self.inner.create(path, data, acls, mode)
        }

        fn set_acl(&self, path: &str, acls: &[Acl], version: Option<i32>) -> ClientResult<()> {
            self.inner.set_acl(path, acls, version)
        }

        fn set_data(
            &self,
            path: &str,
            data: Option<&[u8]>,
            version: Option<i32>,
        ) -> ClientResult<()> {
            self.inner.set_data(path, data, version)
        }

        fn exists(&self, path: &str) -> ClientResult<bool> {
            self.inner.exists(path)
        }
    }

    #[test]
    fn test_lost_creation_race_is_not_an_error() {
        let tree = RacingTree {
            inner: MemoryTree::new(),
            races: Cell::new(0),
        };
        PathCreator::new(&tree).ensure("/x/y").expect("ensure");

        assert_eq!(tree.races.get(), 2);
        assert_eq!(tree.inner.entries()["/x/y"].data, b"theirs");
    }

    #[test]
    fn test_other_failures_propagate() {
        let tree = MemoryTree::new();
        tree.create("/e", None, &[], CreateMode::Ephemeral)
            .expect("create");
        let err = PathCreator::new(&tree)
            .ensure("/e/child")
            .expect_err("ephemeral parent");
        assert!(matches!(err, crate::Error::Client(ClientError::Remote { .. })));
    }
}
