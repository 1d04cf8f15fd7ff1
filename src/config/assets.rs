//! Extra files shipped inside a distribution.

use crate::error::{Error, Result};
use std::path::PathBuf;

/// An ordered collection of file roots with optional include filters.
///
/// A directory root contributes its contents, a file root contributes the
/// file itself. Without include patterns each tree is copied verbatim,
/// empty directories included. With include patterns only matching files
/// are copied.
#[derive(Debug, Clone)]
pub struct FileSet {
    pub(crate) roots: Vec<PathBuf>,
    pub(crate) includes: Vec<String>,
}

impl FileSet {
    /// A file set with a single root.
    pub fn of(root: impl Into<PathBuf>) -> Self {
        Self {
            roots: vec![root.into()],
            includes: Vec::new(),
        }
    }

    /// Adds another root, copied after the existing ones.
    pub fn and(mut self, root: impl Into<PathBuf>) -> Self {
        self.roots.push(root.into());
        self
    }

    /// Adds a glob filter.
    ///
    /// Patterns match paths relative to each root with `/` separators;
    /// `*` stays within one path segment, `**` crosses segments. Once any
    /// pattern is present only matching files are copied.
    pub fn include(mut self, pattern: impl Into<String>) -> Self {
        self.includes.push(pattern.into());
        self
    }

    pub(crate) fn validate(&self, context: &str) -> Result<()> {
        if self.roots.is_empty() {
            return Err(Error::config(format!("{context}: file set has no roots")));
        }
        for pattern in &self.includes {
            glob::Pattern::new(pattern).map_err(|e| {
                Error::config(format!(
                    "{context}: invalid include pattern {pattern:?}: {e}"
                ))
            })?;
        }
        Ok(())
    }
}

/// A [`FileSet`] bound to a destination inside the distribution root.
///
/// `dest_subdir` is relative to the root; `"."` targets the root itself.
#[derive(Debug, Clone)]
pub struct AssetBinding {
    pub(crate) dest: PathBuf,
    pub(crate) files: FileSet,
}

impl AssetBinding {
    /// Binds `files` to `dest_subdir`.
    pub fn new(dest_subdir: impl Into<PathBuf>, files: FileSet) -> Self {
        Self {
            dest: dest_subdir.into(),
            files,
        }
    }
}
