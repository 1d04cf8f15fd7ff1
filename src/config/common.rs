//! Settings shared by every variant.

use super::assets::AssetBinding;
use crate::runtime::RuntimeSource;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Configuration applied to every variant of a build.
///
/// Frozen by [`DistConfigBuilder::build`](super::DistConfigBuilder::build);
/// afterwards only readable.
#[derive(Clone)]
pub struct CommonConfig {
    pub(crate) app_name: String,
    pub(crate) jre_relative_path: PathBuf,
    pub(crate) lib_relative_path: PathBuf,
    pub(crate) depends_on_steps: Vec<String>,
    pub(crate) assets: Vec<AssetBinding>,
    pub(crate) runtime_source: Arc<dyn RuntimeSource>,
    pub(crate) http_timeout: Option<Duration>,
}

impl CommonConfig {
    /// The application name, used as the distribution's root directory name
    /// and as the stem of archive artifacts.
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Where the bundled runtime lands, relative to the distribution root.
    pub fn jre_relative_path(&self) -> &Path {
        &self.jre_relative_path
    }

    /// Where application jars land, relative to the distribution root.
    pub fn lib_relative_path(&self) -> &Path {
        &self.lib_relative_path
    }

    /// Build steps the host tool must run before packaging.
    ///
    /// Published metadata only; the engine never executes steps itself.
    pub fn depends_on_steps(&self) -> &[String] {
        &self.depends_on_steps
    }

    /// Asset bindings applied to every variant, in declaration order.
    pub fn assets(&self) -> &[AssetBinding] {
        &self.assets
    }

    /// The runtime source all variants provision from.
    pub fn runtime_source(&self) -> &Arc<dyn RuntimeSource> {
        &self.runtime_source
    }

    /// Total per-request timeout for runtime downloads, when set.
    pub fn http_timeout(&self) -> Option<Duration> {
        self.http_timeout
    }
}

impl fmt::Debug for CommonConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommonConfig")
            .field("app_name", &self.app_name)
            .field("jre_relative_path", &self.jre_relative_path)
            .field("lib_relative_path", &self.lib_relative_path)
            .field("depends_on_steps", &self.depends_on_steps)
            .field("assets", &self.assets)
            .field("runtime_source", &"<dyn RuntimeSource>")
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}
