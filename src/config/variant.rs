//! Distribution variants.

use super::assets::{AssetBinding, FileSet};
use super::platform::Platform;
use crate::archive::ArchiveFormat;
use std::fmt;
use std::path::PathBuf;

/// How a variant's final artifact is produced.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum PackagingKind {
    /// Leave the assembled directory in place as the artifact.
    Directory,
    /// Compress the assembled directory and delete it afterwards.
    Archive(ArchiveFormat),
}

impl PackagingKind {
    /// The archive format, when the variant produces an archive.
    pub fn archive_format(&self) -> Option<ArchiveFormat> {
        match self {
            Self::Directory => None,
            Self::Archive(format) => Some(*format),
        }
    }
}

impl fmt::Display for PackagingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Directory => f.write_str("directory"),
            Self::Archive(format) => format.fmt(f),
        }
    }
}

/// A config file copied into the assembled distribution.
#[derive(Debug, Clone)]
pub(crate) struct ConfigFile {
    pub(crate) source: PathBuf,
    pub(crate) target: PathBuf,
}

/// One concrete distribution to produce.
///
/// A variant names its output directory under the configured output root
/// and fixes the target platform and packaging kind. It can carry its own
/// assets and a config file on top of the common configuration.
#[derive(Debug, Clone)]
pub struct DistVariant {
    pub(crate) name: String,
    pub(crate) platform: Platform,
    pub(crate) packaging: PackagingKind,
    pub(crate) config_file: Option<ConfigFile>,
    pub(crate) assets: Vec<AssetBinding>,
}

impl DistVariant {
    /// A variant that keeps the assembled directory as its artifact.
    pub fn directory(name: impl Into<String>, platform: Platform) -> Self {
        Self {
            name: name.into(),
            platform,
            packaging: PackagingKind::Directory,
            config_file: None,
            assets: Vec::new(),
        }
    }

    /// A variant that compresses the assembled directory into `format`.
    pub fn archive(name: impl Into<String>, platform: Platform, format: ArchiveFormat) -> Self {
        Self {
            name: name.into(),
            platform,
            packaging: PackagingKind::Archive(format),
            config_file: None,
            assets: Vec::new(),
        }
    }

    /// Copies `source` to `target` inside the distribution root.
    ///
    /// Applied after all assets, so it wins over files they placed.
    /// `target` is relative to the distribution root.
    pub fn config_file(mut self, source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
        self.config_file = Some(ConfigFile {
            source: source.into(),
            target: target.into(),
        });
        self
    }

    /// Adds a variant asset binding, applied after the common ones.
    pub fn asset(mut self, dest_subdir: impl Into<PathBuf>, files: FileSet) -> Self {
        self.assets.push(AssetBinding::new(dest_subdir, files));
        self
    }

    /// The variant name, also its directory name under the output root.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The platform whose runtime this variant bundles.
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// How the final artifact is produced.
    pub fn packaging(&self) -> PackagingKind {
        self.packaging
    }
}
