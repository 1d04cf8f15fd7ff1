//! The packaging pipeline.
//!
//! [`DistBuilder`] turns a validated [`DistConfig`] plus the host build's
//! [`ApplicationInputs`] into finished distributions, one per variant.

mod assembler;

use crate::config::{DistConfig, DistVariant, PackagingKind, Platform};
use crate::error::{Error, Result};
use crate::runtime::{RuntimeCache, RuntimeProvisioner};
use assembler::VariantAssembler;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Outputs of the host build step that get packaged.
///
/// The engine never builds the application itself; the embedding tool runs
/// the steps named by
/// [`CommonConfig::depends_on_steps`](crate::config::CommonConfig::depends_on_steps)
/// and hands the results over here.
#[derive(Debug, Clone)]
pub struct ApplicationInputs {
    artifact: PathBuf,
    classpath: Vec<PathBuf>,
}

impl ApplicationInputs {
    /// `artifact` is the runnable application jar, `classpath` its resolved
    /// runtime dependencies.
    pub fn new<I, P>(artifact: impl Into<PathBuf>, classpath: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            artifact: artifact.into(),
            classpath: classpath.into_iter().map(Into::into).collect(),
        }
    }

    /// The runnable application artifact.
    pub fn artifact(&self) -> &Path {
        &self.artifact
    }

    /// The resolved runtime classpath, in dependency order.
    pub fn classpath(&self) -> &[PathBuf] {
        &self.classpath
    }
}

/// A finished variant artifact.
#[derive(Debug, Clone)]
pub struct BuiltDistribution {
    /// Name of the variant that produced this artifact.
    pub variant: String,
    /// Platform whose runtime is bundled.
    pub platform: Platform,
    /// How the artifact is packaged.
    pub kind: PackagingKind,
    /// The artifact itself: a directory tree or an archive file.
    pub path: PathBuf,
    /// SHA-256 digest of the artifact.
    pub sha256: String,
    /// Size in bytes; for directories, the sum of all file sizes.
    pub size: u64,
}

/// Builds distributions from a configuration and application inputs.
pub struct DistBuilder {
    config: DistConfig,
    inputs: ApplicationInputs,
    provisioner: RuntimeProvisioner,
}

impl DistBuilder {
    /// Creates a builder packaging `inputs` according to `config`.
    pub fn new(config: DistConfig, inputs: ApplicationInputs) -> Result<Self> {
        let provisioner = RuntimeProvisioner::new(
            Arc::clone(config.common().runtime_source()),
            RuntimeCache::new(config.work_dir().join("jre-cache")),
            config.common().http_timeout(),
        )?;
        Ok(Self {
            config,
            inputs,
            provisioner,
        })
    }

    /// The configuration this builder packages for.
    pub fn config(&self) -> &DistConfig {
        &self.config
    }

    /// Builds every configured variant in declaration order, stopping at the
    /// first failure.
    ///
    /// There is no partial-success mode; rerunning after a failure rebuilds
    /// the affected variants from scratch.
    pub async fn build_all(&self) -> Result<Vec<BuiltDistribution>> {
        let mut built = Vec::with_capacity(self.config.variants().len());
        for variant in self.config.variants() {
            built.push(self.run(variant).await?);
        }
        Ok(built)
    }

    /// Builds the named variant.
    pub async fn build_variant(&self, name: &str) -> Result<BuiltDistribution> {
        let variant = self
            .config
            .variant(name)
            .ok_or_else(|| Error::config(format!("unknown variant {name:?}")))?;
        self.run(variant).await
    }

    async fn run(&self, variant: &DistVariant) -> Result<BuiltDistribution> {
        log::info!(
            "building variant '{}' for {} ({})",
            variant.name(),
            variant.platform(),
            variant.packaging()
        );
        VariantAssembler {
            config: &self.config,
            inputs: &self.inputs,
            provisioner: &self.provisioner,
            variant,
        }
        .run()
        .await
    }
}
