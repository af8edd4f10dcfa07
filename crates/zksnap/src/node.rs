// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

/// Metadata the tree service reports for a node
///
/// Two reads of the same node version compare equal field by field; any
/// change to data, ACL or children in between shows up as a difference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeStat {
    /// Transaction that created the node
    pub czxid: i64,
    /// Transaction that last modified the data
    pub mzxid: i64,
    /// Transaction that last modified the children
    pub pzxid: i64,
    /// Creation time, epoch milliseconds
    pub ctime: i64,
    /// Last modification time, epoch milliseconds
    pub mtime: i64,
    /// Number of changes to the data
    pub version: i32,
    /// Number of changes to the children
    pub cversion: i32,
    /// Number of changes to the ACL
    pub aversion: i32,
    /// Owning session for ephemeral nodes, zero for persistent ones
    pub ephemeral_owner: i64,
    pub data_length: i32,
    pub num_children: i32,
}

impl NodeStat {
    #[must_use]
    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral_owner != 0
    }
}

/// Permission bits of an ACL entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Perms(pub i32);

impl Perms {
    pub const READ: Perms = Perms(1);
    pub const WRITE: Perms = Perms(1 << 1);
    pub const CREATE: Perms = Perms(1 << 2);
    pub const DELETE: Perms = Perms(1 << 3);
    pub const ADMIN: Perms = Perms(1 << 4);
    pub const ALL: Perms = Perms(31);

    #[must_use]
    pub fn bits(self) -> i32 {
        self.0
    }

    #[must_use]
    pub fn contains(self, other: Perms) -> bool {
        self.0 & other.0 == other.0
    }
}

impl fmt::Display for Perms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (flag, letter) in [
            (Perms::READ, 'r'),
            (Perms::WRITE, 'w'),
            (Perms::CREATE, 'c'),
            (Perms::DELETE, 'd'),
            (Perms::ADMIN, 'a'),
        ] {
            if self.contains(flag) {
                write!(f, "{letter}")?;
            }
        }
        Ok(())
    }
}

/// Who an ACL entry applies to
///
/// `world:anyone` is the well-known identity every service recognizes; it is
/// kept as its own variant so restored ACLs compare equal to the service's
/// built-in open ACL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    Anyone,
    Other { scheme: String, id: String },
}

impl Identity {
    pub const WORLD_SCHEME: &'static str = "world";
    pub const ANYONE_ID: &'static str = "anyone";

    /// Build an identity, binding `world:anyone` to [`Identity::Anyone`]
    pub fn new<S: Into<String>, I: Into<String>>(scheme: S, id: I) -> Self {
        let scheme = scheme.into();
        let id = id.into();
        if scheme == Self::WORLD_SCHEME && id == Self::ANYONE_ID {
            Identity::Anyone
        } else {
            Identity::Other { scheme, id }
        }
    }

    #[must_use]
    pub fn scheme(&self) -> &str {
        match self {
            Identity::Anyone => Self::WORLD_SCHEME,
            Identity::Other { scheme, .. } => scheme,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Identity::Anyone => Self::ANYONE_ID,
            Identity::Other { id, .. } => id,
        }
    }
}

/// One ACL entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Acl {
    pub perms: Perms,
    pub id: Identity,
}

impl Acl {
    #[must_use]
    pub fn new(perms: Perms, id: Identity) -> Self {
        Self { perms, id }
    }

    /// `world:anyone` with every permission, used for placeholder ancestors
    #[must_use]
    pub fn open() -> Self {
        Self::new(Perms::ALL, Identity::Anyone)
    }
}

impl fmt::Display for Acl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.id.scheme(), self.id.id(), self.perms)
    }
}

/// One node of the tree as captured by a backup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    pub path: String,
    pub stat: NodeStat,
    /// `None` when the node has no payload, distinct from an empty payload
    pub data: Option<Vec<u8>>,
    pub acls: Vec<Acl>,
}

impl NodeRecord {
    #[must_use]
    pub fn ephemeral_owner(&self) -> i64 {
        self.stat.ephemeral_owner
    }
}
