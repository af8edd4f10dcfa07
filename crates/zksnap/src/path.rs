// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Slash-delimited node path helpers
//!
//! Node paths are plain strings, not filesystem paths: `/` is the root, every
//! other path is `/`-separated segments with no trailing slash.

use crate::{Error, Result};

/// The root node path
pub const ROOT: &str = "/";

/// Parent of a node path; the root is its own parent
#[must_use]
pub fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) | None => ROOT,
        Some(idx) => &path[..idx],
    }
}

/// Full path of a child named `name` under `parent`
#[must_use]
pub fn child_path(parent: &str, name: &str) -> String {
    if parent.ends_with('/') {
        format!("{parent}{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// True when `path` is `root` itself or lies beneath it
///
/// Containment is decided on segment boundaries: `/a` contains `/a/b` but not
/// `/ab`.
#[must_use]
pub fn is_within(root: &str, path: &str) -> bool {
    if root == ROOT {
        return path.starts_with('/');
    }
    match path.strip_prefix(root) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Check that `path` is a well-formed absolute node path
pub fn validate_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(Error::invalid_path(path, "path must not be empty"));
    }
    if !path.starts_with('/') {
        return Err(Error::invalid_path(path, "path must start with '/'"));
    }
    if path == ROOT {
        return Ok(());
    }
    if path.ends_with('/') {
        return Err(Error::invalid_path(path, "path must not end with '/'"));
    }
    if path.contains('\0') {
        return Err(Error::invalid_path(path, "path must not contain NUL"));
    }
    for segment in path[1..].split('/') {
        match segment {
            "" => return Err(Error::invalid_path(path, "empty path segment")),
            "." | ".." => return Err(Error::invalid_path(path, "relative path segment")),
            _ => {}
        }
    }
    Ok(())
}
