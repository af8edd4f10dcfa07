// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Policy knobs for backup and restore runs

use crate::filter::PathFilter;
use crate::path::ROOT;

/// Default consistency-read attempt budget
pub const DEFAULT_NUM_RETRIES: u32 = 5;

/// Options for [`crate::BackupEngine`]
#[derive(Debug, Clone)]
pub struct BackupOptions {
    /// Where the walk starts
    pub root_path: String,
    /// Emit ephemeral nodes instead of skipping them
    pub backup_ephemeral: bool,
    /// Total attempts at a consistent read of one node
    pub num_retries: u32,
    pub filter: PathFilter,
    /// Indent the JSON output
    pub pretty_print: bool,
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self {
            root_path: ROOT.to_string(),
            backup_ephemeral: false,
            num_retries: DEFAULT_NUM_RETRIES,
            filter: PathFilter::default(),
            pretty_print: false,
        }
    }
}

impl BackupOptions {
    #[must_use]
    pub fn with_root_path<S: Into<String>>(mut self, root_path: S) -> Self {
        self.root_path = root_path.into();
        self
    }

    #[must_use]
    pub fn with_backup_ephemeral(mut self, backup_ephemeral: bool) -> Self {
        self.backup_ephemeral = backup_ephemeral;
        self
    }

    #[must_use]
    pub fn with_num_retries(mut self, num_retries: u32) -> Self {
        self.num_retries = num_retries;
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: PathFilter) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub fn with_pretty_print(mut self, pretty_print: bool) -> Self {
        self.pretty_print = pretty_print;
        self
    }
}

/// Options for [`crate::RestoreEngine`]
#[derive(Debug, Clone)]
pub struct RestoreOptions {
    /// Only records at or beneath this path are applied
    pub root_path: String,
    /// Replace data and ACLs of nodes that already exist
    pub overwrite_existing: bool,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self {
            root_path: ROOT.to_string(),
            overwrite_existing: false,
        }
    }
}

impl RestoreOptions {
    #[must_use]
    pub fn with_root_path<S: Into<String>>(mut self, root_path: S) -> Self {
        self.root_path = root_path.into();
        self
    }

    #[must_use]
    pub fn with_overwrite_existing(mut self, overwrite_existing: bool) -> Self {
        self.overwrite_existing = overwrite_existing;
        self
    }
}
