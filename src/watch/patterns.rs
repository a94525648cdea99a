// src/watch/patterns.rs

use std::fmt;

use anyhow::Context;
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::errors::{Error, Result};

/// Compiled include/exclude globs for a watch registration.
///
/// Patterns are evaluated against paths relative to the watched root, with
/// forward slashes, e.g. `"content/posts/intro.md"`.
#[derive(Clone)]
pub struct WatchPatterns {
    include: GlobSet,
    exclude: Option<GlobSet>,
}

impl WatchPatterns {
    /// Compile pattern lists into matchers. At least one include pattern is
    /// required; an empty exclude list means nothing is excluded.
    pub fn compile(include: &[String], exclude: &[String]) -> Result<Self> {
        if include.is_empty() {
            return Err(Error::Watch("no watch patterns configured".to_string()));
        }

        let include_set = build_globset(include).context("compiling watch patterns")?;
        let exclude_set = if exclude.is_empty() {
            None
        } else {
            Some(build_globset(exclude).context("compiling watch exclude patterns")?)
        };

        Ok(Self {
            include: include_set,
            exclude: exclude_set,
        })
    }

    /// True when a changed path should trigger a rebuild.
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.include.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }
}

impl fmt::Debug for WatchPatterns {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchPatterns")
            .field("include", &self.include.len())
            .field("exclude", &self.exclude.as_ref().map(GlobSet::len))
            .finish_non_exhaustive()
    }
}

/// Build a `GlobSet` from plain string patterns.
pub(crate) fn build_globset(patterns: &[String]) -> anyhow::Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob =
            Glob::new(pattern).with_context(|| format!("invalid glob pattern: {pattern}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
