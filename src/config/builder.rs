//! Builder for constructing a validated [`DistConfig`].

use super::assets::{AssetBinding, FileSet};
use super::common::CommonConfig;
use super::variant::DistVariant;
use super::DistConfig;
use crate::error::{Error, Result};
use crate::runtime::RuntimeSource;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Builder for [`DistConfig`].
///
/// Provides a fluent API with validation; [`build`](Self::build) performs
/// every configuration check up front and does no I/O.
///
/// # Examples
///
/// ```no_run
/// use jredist::archive::ArchiveFormat;
/// use jredist::config::{DistConfigBuilder, DistVariant, FileSet, Platform};
/// use jredist::runtime::CorrettoRuntimeSource;
///
/// # fn example() -> jredist::Result<()> {
/// let config = DistConfigBuilder::new()
///     .app_name("acme-app")
///     .runtime_source(CorrettoRuntimeSource::new(21))
///     .output_dir("build/dist")
///     .asset("docs", FileSet::of("assets/manual.pdf"))
///     .variant(DistVariant::archive(
///         "linux",
///         Platform::Linux64,
///         ArchiveFormat::TarGz,
///     ))
///     .variant(DistVariant::archive(
///         "windows",
///         Platform::Windows64,
///         ArchiveFormat::Zip,
///     ))
///     .build()?;
/// # let _ = config;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct DistConfigBuilder {
    app_name: Option<String>,
    jre_relative_path: Option<PathBuf>,
    lib_relative_path: Option<PathBuf>,
    depends_on_steps: Option<Vec<String>>,
    runtime_source: Option<Arc<dyn RuntimeSource>>,
    assets: Vec<AssetBinding>,
    variants: Vec<DistVariant>,
    output_dir: Option<PathBuf>,
    work_dir: Option<PathBuf>,
    http_timeout: Option<Duration>,
}

impl DistConfigBuilder {
    /// Creates a new config builder.
    pub fn new() -> Self {
        Default::default()
    }

    /// Sets the application name.
    ///
    /// Names the distribution's root directory and the stem of archive
    /// artifacts, so it must be a plain file name.
    ///
    /// # Required
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// Sets where the bundled runtime lands, relative to the distribution
    /// root.
    ///
    /// Default: `jre`
    pub fn jre_relative_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.jre_relative_path = Some(path.into());
        self
    }

    /// Sets where application jars land, relative to the distribution root.
    ///
    /// Default: `lib`
    pub fn lib_relative_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.lib_relative_path = Some(path.into());
        self
    }

    /// Sets the build steps the host tool must run before packaging.
    ///
    /// Metadata for the embedding build system; the engine never runs
    /// steps itself.
    ///
    /// Default: `["jar"]`
    pub fn depends_on_steps<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends_on_steps = Some(steps.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the source that provides the Java runtime for each platform.
    ///
    /// # Required
    pub fn runtime_source(mut self, source: impl RuntimeSource + 'static) -> Self {
        self.runtime_source = Some(Arc::new(source));
        self
    }

    /// Adds an asset binding applied to every variant.
    ///
    /// Bindings are applied in declaration order; `dest_subdir` is relative
    /// to the distribution root, `"."` targets the root itself.
    pub fn asset(mut self, dest_subdir: impl Into<PathBuf>, files: FileSet) -> Self {
        self.assets.push(AssetBinding::new(dest_subdir, files));
        self
    }

    /// Adds a distribution variant.
    pub fn variant(mut self, variant: DistVariant) -> Self {
        self.variants.push(variant);
        self
    }

    /// Sets the directory variant outputs are written under.
    ///
    /// # Required
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Sets the directory for the runtime cache and scratch space.
    ///
    /// Default: `<output_dir>/.work`
    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    /// Bounds each runtime download request with a total timeout.
    ///
    /// Default: no timeout
    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = Some(timeout);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a required field is missing, a name or
    /// relative path is malformed, a variant name repeats, or an include
    /// pattern does not compile.
    pub fn build(self) -> Result<DistConfig> {
        let app_name = self
            .app_name
            .ok_or_else(|| Error::config("app_name is required"))?;
        require_plain_component(&app_name, "app_name")?;

        let runtime_source = self
            .runtime_source
            .ok_or_else(|| Error::config("runtime_source is required"))?;

        let output_dir = self
            .output_dir
            .ok_or_else(|| Error::config("output_dir is required"))?;
        if output_dir.as_os_str().is_empty() {
            return Err(Error::config("output_dir must not be empty"));
        }

        let jre_relative_path = self.jre_relative_path.unwrap_or_else(|| PathBuf::from("jre"));
        require_relative(&jre_relative_path, "jre_relative_path")?;
        let lib_relative_path = self.lib_relative_path.unwrap_or_else(|| PathBuf::from("lib"));
        require_relative(&lib_relative_path, "lib_relative_path")?;
        let depends_on_steps = self
            .depends_on_steps
            .unwrap_or_else(|| vec!["jar".to_string()]);

        for binding in &self.assets {
            require_relative(&binding.dest, "asset destination")?;
            let context = format!("common asset '{}'", binding.dest.display());
            binding.files.validate(&context)?;
        }

        let mut seen = std::collections::HashSet::new();
        for variant in &self.variants {
            require_variant_name(&variant.name)?;
            if !seen.insert(variant.name.clone()) {
                return Err(Error::config(format!(
                    "duplicate variant name {:?}",
                    variant.name
                )));
            }
            for binding in &variant.assets {
                require_relative(&binding.dest, "asset destination")?;
                let context = format!(
                    "asset '{}' of variant '{}'",
                    binding.dest.display(),
                    variant.name
                );
                binding.files.validate(&context)?;
            }
            if let Some(config_file) = &variant.config_file {
                if config_file.source.as_os_str().is_empty() {
                    return Err(Error::config(format!(
                        "config file source of variant '{}' must not be empty",
                        variant.name
                    )));
                }
                require_relative(&config_file.target, "config file target")?;
            }
        }

        let work_dir = self.work_dir.unwrap_or_else(|| output_dir.join(".work"));

        Ok(DistConfig {
            common: CommonConfig {
                app_name,
                jre_relative_path,
                lib_relative_path,
                depends_on_steps,
                assets: self.assets,
                runtime_source,
                http_timeout: self.http_timeout,
            },
            variants: self.variants,
            output_dir,
            work_dir,
        })
    }
}

fn require_plain_component(value: &str, what: &str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::config(format!("{what} must not be empty")));
    }
    let mut components = Path::new(value).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(Error::config(format!(
            "{what} must be a plain file name, got {value:?}"
        ))),
    }
}

fn require_variant_name(name: &str) -> Result<()> {
    require_plain_component(name, "variant name")?;
    if name.starts_with('.') {
        return Err(Error::config(format!(
            "variant name must not start with '.', got {name:?}"
        )));
    }
    Ok(())
}

fn require_relative(path: &Path, what: &str) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(Error::config(format!("{what} must not be empty")));
    }
    if path.is_absolute() {
        return Err(Error::config(format!(
            "{what} must be relative, got {}",
            path.display()
        )));
    }
    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(Error::config(format!(
            "{what} must not contain '..', got {}",
            path.display()
        )));
    }
    Ok(())
}
