//! Per-variant assembly: runtime, libraries, assets, final artifact.

use super::{ApplicationInputs, BuiltDistribution};
use crate::archive;
use crate::config::{AssetBinding, DistConfig, DistVariant, FileSet};
use crate::error::{Error, FsContext, Result};
use crate::runtime::RuntimeProvisioner;
use crate::util::{checksum, fs};
use std::collections::HashSet;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Assembles one variant's distribution tree and produces its artifact.
pub(crate) struct VariantAssembler<'a> {
    pub(crate) config: &'a DistConfig,
    pub(crate) inputs: &'a ApplicationInputs,
    pub(crate) provisioner: &'a RuntimeProvisioner,
    pub(crate) variant: &'a DistVariant,
}

impl VariantAssembler<'_> {
    pub(crate) async fn run(&self) -> Result<BuiltDistribution> {
        let variant_dir = self.config.output_dir().join(self.variant.name());
        fs::create_dir_all(&variant_dir, true).await?;
        let root = variant_dir.join(self.config.common().app_name());
        fs::create_dir_all(&root, true).await?;

        let jre_dir = root.join(self.config.common().jre_relative_path());
        self.provisioner
            .materialize(self.variant.platform(), &jre_dir)
            .await?;

        self.install_libraries(&root).await?;
        self.apply_assets(&root).await?;
        self.apply_config_file(&root).await?;

        let artifact = self.finalize(&variant_dir, &root).await?;
        let sha256 = checksum::sha256_of(&artifact).await?;
        let size = checksum::size_of(&artifact).await?;
        log::info!(
            "variant '{}' built: {} ({size} bytes)",
            self.variant.name(),
            artifact.display()
        );
        Ok(BuiltDistribution {
            variant: self.variant.name().to_string(),
            platform: self.variant.platform(),
            kind: self.variant.packaging(),
            path: artifact,
            sha256,
            size,
        })
    }

    /// Installs the application artifact and every classpath entry into the
    /// library directory, keeping original file names.
    async fn install_libraries(&self, root: &Path) -> Result<()> {
        let lib_dir = root.join(self.config.common().lib_relative_path());
        fs::create_dir_all(&lib_dir, true).await?;

        let mut installed: HashSet<OsString> = HashSet::new();
        let mut sources = vec![self.inputs.artifact().to_path_buf()];
        sources.extend(self.inputs.classpath().iter().cloned());
        for source in sources {
            let Some(name) = source.file_name() else {
                return Err(Error::config(format!(
                    "classpath entry {} has no file name",
                    source.display()
                )));
            };
            if !installed.insert(name.to_os_string()) {
                log::warn!("library name collision on {name:?}, keeping the last copy");
            }
            let target = lib_dir.join(name);
            let metadata = tokio::fs::metadata(&source)
                .await
                .fs_context("reading", &source)?;
            if metadata.is_dir() {
                fs::copy_dir_contents(&source, &target).await?;
            } else {
                fs::copy_file(&source, &target).await?;
            }
        }
        Ok(())
    }

    /// Common bindings first, then the variant's own, in declaration order.
    async fn apply_assets(&self, root: &Path) -> Result<()> {
        for binding in self.config.common().assets() {
            self.apply_binding(root, binding).await?;
        }
        for binding in &self.variant.assets {
            self.apply_binding(root, binding).await?;
        }
        Ok(())
    }

    async fn apply_binding(&self, root: &Path, binding: &AssetBinding) -> Result<()> {
        let dest = root.join(&binding.dest);
        log::debug!("copying assets into {}", dest.display());
        copy_file_set(&binding.files, &dest).await
    }

    async fn apply_config_file(&self, root: &Path) -> Result<()> {
        if let Some(config_file) = &self.variant.config_file {
            log::debug!("installing config file at {}", config_file.target.display());
            fs::copy_file(&config_file.source, &root.join(&config_file.target)).await?;
        }
        Ok(())
    }

    /// Leaves the directory in place or compresses it, per the variant.
    async fn finalize(&self, variant_dir: &Path, root: &Path) -> Result<PathBuf> {
        match self.variant.packaging().archive_format() {
            None => Ok(root.to_path_buf()),
            Some(format) => {
                let artifact = variant_dir.join(format!(
                    "{}.{}",
                    self.config.common().app_name(),
                    format.extension()
                ));
                log::info!("compressing {} into {}", root.display(), artifact.display());
                archive::compress(root, format, &artifact).await?;
                fs::remove_dir_all(root).await?;
                Ok(artifact)
            }
        }
    }
}

/// Copies a [`FileSet`] into `dest`.
///
/// Roots are processed in declaration order, later files overwriting
/// earlier ones. Without include patterns directory roots are copied
/// verbatim; with patterns only matching files are copied and empty
/// directories are dropped. A missing root is an error.
pub(crate) async fn copy_file_set(files: &FileSet, dest: &Path) -> Result<()> {
    let patterns = compile_patterns(&files.includes)?;
    for root in &files.roots {
        let metadata = tokio::fs::metadata(root).await.fs_context("reading", root)?;
        if metadata.is_file() {
            let Some(name) = root.file_name() else {
                return Err(Error::config(format!(
                    "asset root {} has no file name",
                    root.display()
                )));
            };
            if matches_any(&patterns, Path::new(name)) {
                fs::copy_file(root, &dest.join(name)).await?;
            }
        } else if patterns.is_empty() {
            fs::copy_dir_contents(root, dest).await?;
        } else {
            copy_filtered_tree(root, dest, patterns.clone()).await?;
        }
    }
    Ok(())
}

async fn copy_filtered_tree(root: &Path, dest: &Path, patterns: Vec<glob::Pattern>) -> Result<()> {
    let root = root.to_path_buf();
    let dest = dest.to_path_buf();
    tokio::task::spawn_blocking(move || {
        for entry in WalkDir::new(&root) {
            let entry = entry.fs_context("walking", &root)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = match entry.path().strip_prefix(&root) {
                Ok(rel) => rel,
                Err(_) => continue,
            };
            if !matches_any(&patterns, rel) {
                continue;
            }
            let target = dest.join(rel);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).fs_context("creating", parent)?;
            }
            std::fs::copy(entry.path(), &target).fs_context("copying to", &target)?;
        }
        Ok(())
    })
    .await
    .map_err(|e| Error::Filesystem {
        op: "copying",
        path: PathBuf::new(),
        source: io::Error::other(format!("copy task panicked: {e}")),
    })?
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<glob::Pattern>> {
    patterns
        .iter()
        .map(|p| {
            glob::Pattern::new(p)
                .map_err(|e| Error::config(format!("invalid include pattern {p:?}: {e}")))
        })
        .collect()
}

fn match_options() -> glob::MatchOptions {
    glob::MatchOptions {
        // Ant-style matching: `*` stays within one path segment.
        require_literal_separator: true,
        ..Default::default()
    }
}

fn matches_any(patterns: &[glob::Pattern], rel: &Path) -> bool {
    patterns.is_empty()
        || patterns
            .iter()
            .any(|p| p.matches_path_with(rel, match_options()))
}
