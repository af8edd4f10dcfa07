// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::Parser;

use cmd::cli::{Cli, Commands};
use cmd::commands::{backup_command, restore_command};
use cmd::zk::ZkTreeClient;

fn main() -> Result<()> {
    // Routes the zookeeper crate's `log` records.
    env_logger::init();

    let cli = Cli::parse();
    let common = cli.command.common();
    if common.verbose {
        diagnostics::init_verbose();
    } else {
        diagnostics::init_diagnostics();
    }

    let client = ZkTreeClient::connect(common)?;
    let result = match &cli.command {
        Commands::Backup(args) => backup_command(&client, args).map(|_| ()),
        Commands::Restore(args) => restore_command(&client, args).map(|_| ()),
    };
    client.close();

    if let Err(err) = &result {
        let message = format!("{err:#}");
        diagnostics::log_error!("{error}", error: message.as_str());
    }
    result
}
