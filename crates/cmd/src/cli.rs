// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use clap::{Args, Parser, Subcommand};
use regex::Regex;
use zksnap::{BackupOptions, DEFAULT_NUM_RETRIES, PathFilter, RestoreOptions};

use crate::common::STDIO;

#[derive(Parser, Debug)]
#[command(author, version, about = "Back up and restore ZooKeeper node trees", long_about = None)]
#[command(name = "zksnap")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write every node under the root path to a backup stream
    Backup(BackupArgs),
    /// Recreate nodes from a backup stream
    Restore(RestoreArgs),
}

impl Commands {
    #[must_use]
    pub fn common(&self) -> &CommonArgs {
        match self {
            Commands::Backup(args) => &args.common,
            Commands::Restore(args) => &args.common,
        }
    }
}

/// Options shared by backup and restore
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// ZooKeeper connection string (e.g. localhost:2181)
    #[arg(short = 'z', long = "zk-connect", value_name = "HOST:PORT,...")]
    pub zk_connect: String,

    /// Time to wait for the session to connect, in milliseconds
    #[arg(long, default_value_t = 10_000, value_name = "MS")]
    pub connect_timeout: u64,

    /// ZooKeeper session timeout, in milliseconds
    #[arg(long, default_value_t = 30_000, value_name = "MS")]
    pub session_timeout: u64,

    /// Gzip the backup output / gunzip the restore input
    #[arg(long)]
    pub compress: bool,

    /// Backup starting point, or the subtree a restore is limited to
    #[arg(long, default_value = "/", value_parser = parse_node_path)]
    pub root_path: String,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Args, Debug, Clone)]
pub struct BackupArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Regular expression of paths to exclude, with their subtrees (repeatable)
    #[arg(long, value_name = "REGEX", value_parser = parse_pattern)]
    pub exclude: Vec<Regex>,

    /// Regular expression of paths to include (repeatable)
    #[arg(long, value_name = "REGEX", value_parser = parse_pattern)]
    pub include: Vec<Regex>,

    /// Back up ephemeral nodes too
    #[arg(long)]
    pub ephemeral: bool,

    /// Attempts at reading a node consistently before giving up
    #[arg(long, default_value_t = DEFAULT_NUM_RETRIES)]
    pub retries: u32,

    /// Output file, '-' for stdout
    #[arg(short, long, default_value = STDIO)]
    pub file: String,

    /// Indent the JSON output
    #[arg(long)]
    pub pretty_print: bool,
}

impl BackupArgs {
    #[must_use]
    pub fn options(&self) -> BackupOptions {
        BackupOptions::default()
            .with_root_path(self.common.root_path.clone())
            .with_backup_ephemeral(self.ephemeral)
            .with_num_retries(self.retries)
            .with_filter(PathFilter::new(self.exclude.clone(), self.include.clone()))
            .with_pretty_print(self.pretty_print)
    }
}

#[derive(Args, Debug, Clone)]
pub struct RestoreArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Input file, '-' for stdin
    #[arg(short, long, default_value = STDIO)]
    pub file: String,

    /// Replace data and ACLs of nodes that already exist
    #[arg(long)]
    pub overwrite: bool,
}

impl RestoreArgs {
    #[must_use]
    pub fn options(&self) -> RestoreOptions {
        RestoreOptions::default()
            .with_root_path(self.common.root_path.clone())
            .with_overwrite_existing(self.overwrite)
    }
}

fn parse_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(pattern)
}

fn parse_node_path(path: &str) -> Result<String, zksnap::Error> {
    zksnap::path::validate_path(path)?;
    Ok(path.to_string())
}
