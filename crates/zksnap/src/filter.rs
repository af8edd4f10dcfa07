// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use crate::Result;
use diagnostics::{log_debug, log_info};
use regex::Regex;

/// Exclude/include regex sets applied to node paths during a backup
///
/// Patterns match anywhere in the path (search, not full match): `tmp`
/// excludes `/app/tmp/x`; anchor with `^`/`$` when needed.
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    exclude: Vec<Regex>,
    include: Vec<Regex>,
}

impl PathFilter {
    #[must_use]
    pub fn new(exclude: Vec<Regex>, include: Vec<Regex>) -> Self {
        Self { exclude, include }
    }

    /// Compile both pattern lists, keeping the given order
    pub fn from_patterns<E, I>(exclude: E, include: I) -> Result<Self>
    where
        E: IntoIterator,
        E::Item: AsRef<str>,
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        Ok(Self {
            exclude: exclude
                .into_iter()
                .map(|p| Regex::new(p.as_ref()))
                .collect::<std::result::Result<_, _>>()?,
            include: include
                .into_iter()
                .map(|p| Regex::new(p.as_ref()))
                .collect::<std::result::Result<_, _>>()?,
        })
    }

    /// True when any exclude pattern matches; the first match wins
    #[must_use]
    pub fn is_excluded(&self, path: &str) -> bool {
        match self.exclude.iter().find(|pattern| pattern.is_match(path)) {
            Some(pattern) => {
                log_info!(
                    "Excluding path: {path} matching pattern: {pattern}",
                    path: path,
                    pattern: pattern.as_str()
                );
                true
            }
            None => false,
        }
    }

    /// True when no include patterns are configured or any of them matches
    #[must_use]
    pub fn is_included(&self, path: &str) -> bool {
        if self.include.is_empty() {
            return true;
        }
        match self.include.iter().find(|pattern| pattern.is_match(path)) {
            Some(pattern) => {
                log_debug!(
                    "Including path: {path} matching pattern: {pattern}",
                    path: path,
                    pattern: pattern.as_str()
                );
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn has_includes(&self) -> bool {
        !self.include.is_empty()
    }
}
