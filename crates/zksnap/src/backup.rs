// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use crate::client::{ClientError, TreeClient};
use crate::codec::{self, RecordSink};
use crate::options::BackupOptions;
use crate::path;
use crate::reader::ConsistentNodeReader;
use crate::{Error, Result};
use diagnostics::{log_debug, log_info, log_warn};
use std::io::Write;

/// Counts from one backup run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackupSummary {
    /// Records written to the stream
    pub written: usize,
    /// Ephemeral nodes left out
    pub ephemeral_skipped: usize,
    /// Nodes deleted while the walk was running
    pub vanished: usize,
    /// Children pruned by an exclude pattern, with their subtrees
    pub excluded: usize,
    /// Visited nodes not emitted because no include pattern matched
    pub not_included: usize,
}

/// Walks a tree pre-order and streams one record per node
pub struct BackupEngine<'a, C: TreeClient + ?Sized> {
    client: &'a C,
    options: &'a BackupOptions,
}

impl<'a, C: TreeClient + ?Sized> BackupEngine<'a, C> {
    #[must_use]
    pub fn new(client: &'a C, options: &'a BackupOptions) -> Self {
        Self { client, options }
    }

    /// Write a backup of the subtree at `root_path` to `writer`
    ///
    /// Siblings are visited in lexicographic order of their full paths, so
    /// two backups of an unchanged tree are byte-identical. Nodes deleted
    /// mid-walk are skipped along with their subtrees.
    ///
    /// # Errors
    /// Fails with [`Error::InvalidPath`] before writing anything when
    /// `root_path` is not a well-formed node path. Aborts on
    /// [`Error::Inconsistent`], on any client failure other than a
    /// vanished node, and on write failures. Records written before the
    /// failure stay in `writer`.
    pub fn backup<W: Write>(&self, writer: W) -> Result<BackupSummary> {
        path::validate_path(&self.options.root_path)?;
        let mut summary = BackupSummary::default();
        log_info!("Starting backup of {root}", root: self.options.root_path.as_str());

        codec::write_records(writer, self.options.pretty_print, |sink| {
            self.walk(sink, &mut summary)
        })?;

        log_info!(
            "Backup complete: {written} nodes written, {ephemeral} ephemeral skipped, {vanished} vanished, {excluded} excluded",
            written: summary.written,
            ephemeral: summary.ephemeral_skipped,
            vanished: summary.vanished,
            excluded: summary.excluded
        );
        Ok(summary)
    }

    fn walk(&self, sink: &mut dyn RecordSink, summary: &mut BackupSummary) -> Result<()> {
        let reader = ConsistentNodeReader::new(self.client, self.options.num_retries);
        let filter = &self.options.filter;
        let mut pending = vec![self.options.root_path.clone()];

        while let Some(current) = pending.pop() {
            let snapshot = match reader.read(&current) {
                Ok(snapshot) => snapshot,
                Err(Error::Client(ClientError::NoNode(_))) => {
                    log_warn!("Node {path} vanished during backup, skipping", path: current.as_str());
                    summary.vanished += 1;
                    continue;
                }
                Err(err) => return Err(err),
            };

            let ephemeral = snapshot.stat.is_ephemeral();
            if ephemeral && !self.options.backup_ephemeral {
                log_debug!(
                    "Skipping ephemeral node {path} owned by session {owner}",
                    path: current.as_str(),
                    owner: snapshot.stat.ephemeral_owner
                );
                summary.ephemeral_skipped += 1;
                continue;
            }

            if filter.is_included(&current) {
                sink.write_record(&snapshot.into_record(&current))?;
                log_debug!("Wrote node {path}", path: current.as_str());
                summary.written += 1;
            } else {
                log_debug!("Path {path} matches no include pattern", path: current.as_str());
                summary.not_included += 1;
            }

            // Ephemeral nodes cannot have children.
            if ephemeral {
                continue;
            }

            let names = match self.client.get_children(&current) {
                Ok(names) => names,
                Err(ClientError::NoNode(_)) => {
                    log_warn!("Node {path} vanished before its children were listed", path: current.as_str());
                    summary.vanished += 1;
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            let mut children: Vec<String> = names
                .iter()
                .map(|name| path::child_path(&current, name))
                .collect();
            children.sort();

            let before = children.len();
            children.retain(|child| !filter.is_excluded(child));
            summary.excluded += before - children.len();

            pending.extend(children.into_iter().rev());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::CreateMode;
    use crate::filter::PathFilter;
    use crate::memory::MemoryTree;
    use crate::node::Acl;

    fn tree_with(paths: &[&str]) -> MemoryTree {
        let tree = MemoryTree::new();
        for path in paths {
            tree.create(path, Some(path.as_bytes()), &[Acl::open()], CreateMode::Persistent)
                .expect("create");
        }
        tree
    }

    fn keys(bytes: &[u8]) -> Vec<String> {
        let mut paths = Vec::new();
        codec::read_records(bytes, |record| {
            paths.push(record.path);
            Ok(())
        })
        .expect("decode");
        paths
    }

    #[test]
    fn test_records_are_pre_order_and_sorted() {
        let tree = tree_with(&["/b", "/a", "/a/z", "/a/c", "/a/c/d", "/ab"]);
        let options = BackupOptions::default();
        let mut out = Vec::new();
        let summary = BackupEngine::new(&tree, &options)
            .backup(&mut out)
            .expect("backup");

        assert_eq!(
            keys(&out),
            vec!["/", "/a", "/a/c", "/a/c/d", "/a/z", "/ab", "/b"]
        );
        assert_eq!(summary.written, 7);
    }

    #[test]
    fn test_output_is_reproducible() {
        let tree = tree_with(&["/x", "/x/y", "/w"]);
        let options = BackupOptions::default().with_pretty_print(true);
        let engine = BackupEngine::new(&tree, &options);

        let mut first = Vec::new();
        let mut second = Vec::new();
        engine.backup(&mut first).expect("backup");
        engine.backup(&mut second).expect("backup");
        assert_eq!(first, second);
    }

    #[test]
    fn test_walk_starts_at_root_path() {
        let tree = tree_with(&["/a", "/a/b", "/c"]);
        let options = BackupOptions::default().with_root_path("/a");
        let mut out = Vec::new();
        BackupEngine::new(&tree, &options)
            .backup(&mut out)
            .expect("backup");
        assert_eq!(keys(&out), vec!["/a", "/a/b"]);
    }

    #[test]
    fn test_missing_root_path_gives_empty_backup() {
        let tree = MemoryTree::new();
        let options = BackupOptions::default().with_root_path("/nowhere");
        let mut out = Vec::new();
        let summary = BackupEngine::new(&tree, &options)
            .backup(&mut out)
            .expect("backup");
        assert_eq!(out, b"{}");
        assert_eq!(summary.vanished, 1);
    }

    #[test]
    fn test_malformed_root_path_writes_nothing() {
        let tree = tree_with(&["/a", "/a/b"]);
        let options = BackupOptions::default().with_root_path("/a/");
        let mut out = Vec::new();
        let err = BackupEngine::new(&tree, &options)
            .backup(&mut out)
            .expect_err("trailing slash");
        assert!(matches!(err, Error::InvalidPath { ref path, .. } if path == "/a/"));
        assert!(out.is_empty());
    }

    #[test]
    fn test_includes_gate_emission_but_not_descent() {
        let tree = tree_with(&["/app", "/app/config", "/app/data"]);
        let filter = PathFilter::from_patterns(["data"], ["config$"]).expect("filter");
        let options = BackupOptions::default().with_filter(filter);
        let mut out = Vec::new();
        let summary = BackupEngine::new(&tree, &options)
            .backup(&mut out)
            .expect("backup");

        assert_eq!(keys(&out), vec!["/app/config"]);
        assert_eq!(summary.excluded, 1);
        assert_eq!(summary.not_included, 2);
    }

    #[test]
    fn test_ephemeral_nodes_follow_the_flag() {
        let tree = MemoryTree::new().with_session_id(7);
        tree.create("/lock", None, &[Acl::open()], CreateMode::Ephemeral)
            .expect("create");

        let options = BackupOptions::default();
        let mut out = Vec::new();
        let summary = BackupEngine::new(&tree, &options)
            .backup(&mut out)
            .expect("backup");
        assert_eq!(keys(&out), vec!["/"]);
        assert_eq!(summary.ephemeral_skipped, 1);

        let options = BackupOptions::default().with_backup_ephemeral(true);
        let mut out = Vec::new();
        BackupEngine::new(&tree, &options)
            .backup(&mut out)
            .expect("backup");
        assert_eq!(keys(&out), vec!["/", "/lock"]);
    }
}
