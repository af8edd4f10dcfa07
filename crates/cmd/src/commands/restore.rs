// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use anyhow::{Context, Result};
use diagnostics::log_info;
use zksnap::{RestoreEngine, RestoreSummary, TreeClient};

use crate::cli::RestoreArgs;
use crate::common::open_input;

/// Restore the backup in the file (or stdin) named in `args` into `client`
pub fn restore_command<C: TreeClient + ?Sized>(
    client: &C,
    args: &RestoreArgs,
) -> Result<RestoreSummary> {
    let options = args.options();
    let input = open_input(&args.file, args.common.compress)?;

    log_info!(
        "Restoring {file} under {root}",
        file: args.file.as_str(),
        root: options.root_path.as_str()
    );
    RestoreEngine::new(client, &options)
        .restore(input)
        .context("Restore failed")
}
