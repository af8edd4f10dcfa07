// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use anyhow::{Context, Result};
use diagnostics::log_info;
use zksnap::{BackupEngine, BackupSummary, TreeClient};

use crate::cli::BackupArgs;
use crate::common::open_output;

/// Back up the tree behind `client` to the file (or stdout) named in `args`
pub fn backup_command<C: TreeClient + ?Sized>(
    client: &C,
    args: &BackupArgs,
) -> Result<BackupSummary> {
    let options = args.options();
    let mut output = open_output(&args.file, args.common.compress)?;

    log_info!(
        "Backing up {root} to {file}",
        root: options.root_path.as_str(),
        file: args.file.as_str()
    );
    let summary = BackupEngine::new(client, &options)
        .backup(&mut output)
        .context("Backup failed")?;
    output
        .finish()
        .with_context(|| format!("Failed to finish writing '{}'", args.file))?;
    Ok(summary)
}
