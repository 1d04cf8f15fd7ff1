//! Build configuration: what to package, for which platforms, in which
//! formats.
//!
//! A [`DistConfig`] is assembled through [`DistConfigBuilder`], which
//! validates everything up front so packaging failures are never caused by
//! malformed configuration.

mod assets;
mod builder;
mod common;
mod platform;
mod variant;

pub use assets::{AssetBinding, FileSet};
pub use builder::DistConfigBuilder;
pub use common::CommonConfig;
pub use platform::Platform;
pub use variant::{DistVariant, PackagingKind};

use std::path::{Path, PathBuf};

/// Frozen, validated build configuration.
#[derive(Debug, Clone)]
pub struct DistConfig {
    pub(crate) common: CommonConfig,
    pub(crate) variants: Vec<DistVariant>,
    pub(crate) output_dir: PathBuf,
    pub(crate) work_dir: PathBuf,
}

impl DistConfig {
    /// Starts a new configuration.
    pub fn builder() -> DistConfigBuilder {
        DistConfigBuilder::new()
    }

    /// Settings shared by every variant.
    pub fn common(&self) -> &CommonConfig {
        &self.common
    }

    /// The configured variants, in declaration order.
    pub fn variants(&self) -> &[DistVariant] {
        &self.variants
    }

    /// Looks up a variant by name.
    pub fn variant(&self, name: &str) -> Option<&DistVariant> {
        self.variants.iter().find(|v| v.name() == name)
    }

    /// The directory variant outputs are written under.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// The directory holding the runtime cache and scratch space.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }
}
