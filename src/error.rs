//! Error types for distribution builds.
//!
//! Every failure surfaces as one of four categories: configuration problems
//! (reported before any I/O), network failures, archive failures, and
//! filesystem failures carrying the offending path. There are no automatic
//! retries anywhere; the runtime cache is the retry substitute.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for distribution build operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for all distribution build operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid declarative input. Raised during configuration
    /// validation or when a runtime source resolves to something the
    /// engine cannot use, always before any network access.
    #[error("configuration error: {0}")]
    Config(String),

    /// A download or checksum fetch failed. Aborts the current variant's
    /// build; the previously valid cache slot is left untouched.
    #[error("network error for {url}: {reason}")]
    Network {
        /// URL that was being fetched.
        url: String,
        /// What went wrong.
        reason: String,
    },

    /// An archive could not be read or written.
    #[error("archive error for {path}: {reason}")]
    Archive {
        /// Archive file (or directory being archived).
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// A filesystem operation failed, with the offending path.
    #[error("error {op} {path}: {source}")]
    Filesystem {
        /// Operation being performed, e.g. "creating".
        op: &'static str,
        /// Path the operation was applied to.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Shorthand for a [`Error::Config`].
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config(reason.into())
    }

    /// Shorthand for a [`Error::Network`].
    pub fn network(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Network {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Shorthand for a [`Error::Archive`].
    pub fn archive(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Archive {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Extension trait attaching an operation and a path to `io::Result`.
///
/// Keeps call sites short while guaranteeing that every filesystem failure
/// names the path it happened on.
pub trait FsContext<T> {
    /// Converts an I/O failure into [`Error::Filesystem`].
    fn fs_context(self, op: &'static str, path: &Path) -> Result<T>;
}

impl<T> FsContext<T> for io::Result<T> {
    fn fs_context(self, op: &'static str, path: &Path) -> Result<T> {
        self.map_err(|source| Error::Filesystem {
            op,
            path: path.to_path_buf(),
            source,
        })
    }
}

impl<T> FsContext<T> for std::result::Result<T, walkdir::Error> {
    fn fs_context(self, op: &'static str, path: &Path) -> Result<T> {
        self.map_err(|source| Error::Filesystem {
            op,
            path: path.to_path_buf(),
            source: source.into(),
        })
    }
}
