// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Point-in-time backup and best-effort restore of a ZooKeeper-style node tree
//!
//! The crate works against any connected [`TreeClient`] and plain byte
//! streams. Opening sessions, parsing flags and compressing the stream are the
//! caller's business (see the `cmd` crate).
//!
//! # Architecture
//!
//! - **PathFilter**: exclude/include regex sets, unanchored search semantics
//! - **ConsistentNodeReader**: pairs the ACL read and the data read of one node,
//!   retrying until both report the same stat
//! - **BackupEngine**: pre-order walk emitting one record per node
//! - **codec**: the JSON stream format, written and parsed incrementally
//! - **PathCreator**: race-tolerant creation of placeholder ancestors
//! - **RestoreEngine**: replays records with root scoping and overwrite policy
//!
//! # Stream format
//!
//! One top-level object keyed by absolute node path:
//!
//! ```text
//! {"/a": {"aversion":0, "ctime":1700000000000, "cversion":0, "czxid":2,
//!         "ephemeralOwner":0, "mtime":1700000000000, "mzxid":2, "pzxid":2,
//!         "version":0, "data":"aGVsbG8=",
//!         "acls":[{"id":"anyone","scheme":"world","perms":31}]}}
//! ```
//!
//! # Usage
//!
//! ```
//! # fn example() -> zksnap::Result<()> {
//! use zksnap::{Acl, BackupEngine, BackupOptions, CreateMode, MemoryTree};
//! use zksnap::{RestoreEngine, RestoreOptions, TreeClient};
//!
//! let source = MemoryTree::new();
//! source.create("/a", Some(b"hello"), &[Acl::open()], CreateMode::Persistent)?;
//!
//! let mut stream = Vec::new();
//! let options = BackupOptions::default();
//! BackupEngine::new(&source, &options).backup(&mut stream)?;
//!
//! let target = MemoryTree::new();
//! let options = RestoreOptions::default();
//! RestoreEngine::new(&target, &options).restore(stream.as_slice())?;
//! assert!(target.exists("/a")?);
//! # Ok(())
//! # }
//! # example().expect("example");
//! ```

mod backup;
mod client;
pub mod codec;
mod creator;
mod error;
mod filter;
mod memory;
mod node;
mod options;
pub mod path;
mod reader;
mod restore;

pub use backup::{BackupEngine, BackupSummary};
pub use client::{ClientError, ClientResult, CreateMode, TreeClient};
pub use creator::PathCreator;
pub use error::Error;
pub use filter::PathFilter;
pub use memory::{MemoryTree, TreeEntry};
pub use node::{Acl, Identity, NodeRecord, NodeStat, Perms};
pub use options::{BackupOptions, DEFAULT_NUM_RETRIES, RestoreOptions};
pub use reader::{ConsistentNodeReader, NodeSnapshot};
pub use restore::{RestoreEngine, RestoreSummary};

/// Result type for backup and restore operations
pub type Result<T> = std::result::Result<T, Error>;
