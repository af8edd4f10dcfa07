// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use crate::Result;
use crate::client::{ClientError, CreateMode, TreeClient};
use crate::codec;
use crate::creator::PathCreator;
use crate::node::NodeRecord;
use crate::options::RestoreOptions;
use crate::path::{self, ROOT};
use diagnostics::{log_debug, log_info, log_warn};
use std::io::Read;

/// Counts from one restore run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    /// Nodes created from records
    pub created: usize,
    /// Existing nodes whose data and ACLs were replaced
    pub overwritten: usize,
    /// Existing nodes left untouched
    pub conflicts: usize,
    pub ephemeral_skipped: usize,
    /// Records outside the restore root
    pub outside_root: usize,
}

/// Replays a backup stream against a tree, one record at a time
pub struct RestoreEngine<'a, C: TreeClient + ?Sized> {
    client: &'a C,
    options: &'a RestoreOptions,
}

impl<'a, C: TreeClient + ?Sized> RestoreEngine<'a, C> {
    #[must_use]
    pub fn new(client: &'a C, options: &'a RestoreOptions) -> Self {
        Self { client, options }
    }

    /// Apply every record in `reader`, in stream order
    ///
    /// # Errors
    /// Fails with [`crate::Error::InvalidPath`] before reading anything when
    /// the restore root is not a well-formed node path. A malformed stream or
    /// any client failure other than an existing node aborts the run. Records
    /// applied before the failure stay applied.
    pub fn restore<R: Read>(&self, reader: R) -> Result<RestoreSummary> {
        path::validate_path(&self.options.root_path)?;
        let mut summary = RestoreSummary::default();
        log_info!(
            "Starting restore under {root}",
            root: self.options.root_path.as_str()
        );

        codec::read_records(reader, |record| self.apply(&record, &mut summary))?;

        log_info!(
            "Restore complete: {created} created, {overwritten} overwritten, {conflicts} conflicts, {ephemeral} ephemeral skipped, {outside} outside root",
            created: summary.created,
            overwritten: summary.overwritten,
            conflicts: summary.conflicts,
            ephemeral: summary.ephemeral_skipped,
            outside: summary.outside_root
        );
        Ok(summary)
    }

    /// Apply a single record
    pub fn apply(&self, record: &NodeRecord, summary: &mut RestoreSummary) -> Result<()> {
        let path = record.path.as_str();

        if record.ephemeral_owner() != 0 {
            log_info!(
                "Skipping ephemeral node {path} owned by session {owner}",
                path: path,
                owner: record.ephemeral_owner()
            );
            summary.ephemeral_skipped += 1;
            return Ok(());
        }

        if !path::is_within(&self.options.root_path, path) {
            log_debug!("Skipping {path} outside restore root", path: path);
            summary.outside_root += 1;
            return Ok(());
        }

        // The root always exists on the target.
        if path == ROOT {
            if self.options.overwrite_existing {
                self.overwrite(record)?;
                summary.overwritten += 1;
            }
            return Ok(());
        }

        PathCreator::new(self.client).ensure(path::parent_of(path))?;

        match self.client.create(
            path,
            record.data.as_deref(),
            &record.acls,
            CreateMode::Persistent,
        ) {
            Ok(()) => {
                log_info!("Created node {path}", path: path);
                summary.created += 1;
            }
            Err(ClientError::NodeExists(_)) if self.options.overwrite_existing => {
                self.overwrite(record)?;
                log_info!("Overwrote existing node {path}", path: path);
                summary.overwritten += 1;
            }
            Err(ClientError::NodeExists(_)) => {
                log_warn!("Node {path} already exists, skipping", path: path);
                summary.conflicts += 1;
            }
            Err(err) => return Err(err.into()),
        }
        Ok(())
    }

    fn overwrite(&self, record: &NodeRecord) -> Result<()> {
        self.client.set_acl(&record.path, &record.acls, None)?;
        self.client
            .set_data(&record.path, record.data.as_deref(), None)?;
        Ok(())
    }
}
