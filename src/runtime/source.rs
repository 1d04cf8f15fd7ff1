//! Where runtimes come from.

use crate::archive::ArchiveFormat;
use crate::config::Platform;
use crate::error::{FsContext, Result};
use crate::util::fs::copy_tree_blocking;
use std::fmt;
use std::path::Path;

/// Packaging of a runtime download.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum RuntimeArchiveKind {
    /// Gzip-compressed tarball.
    TarGz,
    /// Zip archive.
    Zip,
    /// No archive: the URL must name a local directory used as-is.
    None,
}

impl RuntimeArchiveKind {
    /// The matching extraction format, when the payload is an archive.
    pub fn archive_format(&self) -> Option<ArchiveFormat> {
        match self {
            Self::TarGz => Some(ArchiveFormat::TarGz),
            Self::Zip => Some(ArchiveFormat::Zip),
            Self::None => None,
        }
    }
}

impl fmt::Display for RuntimeArchiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TarGz => f.write_str("tar.gz"),
            Self::Zip => f.write_str("zip"),
            Self::None => f.write_str("none"),
        }
    }
}

/// A runtime download location and its packaging.
#[derive(Debug, Clone)]
pub struct RuntimeDownload {
    /// Download location. `http(s)` and `file` schemes are supported.
    pub url: String,
    /// How the payload is packaged.
    pub kind: RuntimeArchiveKind,
}

/// A provider of Java runtimes, one per platform.
///
/// Implementations say where each platform's runtime lives, optionally how
/// to check whether a cached copy is still current, and which files of the
/// extracted payload to keep. [`CorrettoRuntimeSource`] covers Amazon
/// Corretto; custom implementations can point anywhere, including local
/// `file://` mirrors.
pub trait RuntimeSource: Send + Sync {
    /// The archive (or local directory) the platform's runtime comes from.
    fn runtime_url(&self, platform: Platform) -> RuntimeDownload;

    /// URL whose response text serves as the cache freshness token.
    ///
    /// The token is compared byte for byte, never interpreted. Returning
    /// `None` disables caching: every build downloads anew and nothing is
    /// persisted.
    fn checksum_url(&self, _platform: Platform) -> Option<String> {
        None
    }

    /// Expected SHA-256 of the downloaded archive, when known.
    ///
    /// Verified after the download and before extraction, independently of
    /// the freshness token.
    fn archive_sha256(&self, _platform: Platform) -> Option<String> {
        None
    }

    /// Copies the files worth keeping from the extracted payload into the
    /// runtime directory.
    ///
    /// Called on the blocking thread pool. The default keeps everything.
    fn select_files(&self, extracted_dir: &Path, runtime_dir: &Path) -> Result<()> {
        copy_tree_blocking(extracted_dir, runtime_dir)
    }
}

/// Amazon Corretto JDK downloads, keyed by major Java version.
///
/// Uses the `corretto.aws/downloads/latest` endpoints, which always serve
/// the newest build of the requested major version and publish a matching
/// checksum resource. Windows runtimes ship as zip, the rest as tar.gz.
#[derive(Debug, Clone)]
pub struct CorrettoRuntimeSource {
    java_version: u32,
}

impl CorrettoRuntimeSource {
    /// A source for the given major Java version, e.g. `17` or `21`.
    pub fn new(java_version: u32) -> Self {
        Self { java_version }
    }

    fn arch(platform: Platform) -> &'static str {
        match platform {
            Platform::Linux64 => "x64-linux",
            Platform::Windows64 => "x64-windows",
            Platform::MacOs64 => "x64-macos",
        }
    }

    fn kind(platform: Platform) -> RuntimeArchiveKind {
        match platform {
            Platform::Windows64 => RuntimeArchiveKind::Zip,
            _ => RuntimeArchiveKind::TarGz,
        }
    }

    fn file_name(&self, platform: Platform) -> String {
        format!(
            "amazon-corretto-{}-{}-jdk.{}",
            self.java_version,
            Self::arch(platform),
            Self::kind(platform)
        )
    }
}

impl RuntimeSource for CorrettoRuntimeSource {
    fn runtime_url(&self, platform: Platform) -> RuntimeDownload {
        RuntimeDownload {
            url: format!(
                "https://corretto.aws/downloads/latest/{}",
                self.file_name(platform)
            ),
            kind: Self::kind(platform),
        }
    }

    fn checksum_url(&self, platform: Platform) -> Option<String> {
        Some(format!(
            "https://corretto.aws/downloads/latest_checksum/{}",
            self.file_name(platform)
        ))
    }

    /// Adapts to the JDK layout found in the archive.
    ///
    /// JDK 8 archives carry a `jre` subtree inside the top-level folder;
    /// that subtree is the runtime. Modern JDKs are the runtime themselves,
    /// so only the top-level folder is stripped. Anything else is copied
    /// verbatim.
    fn select_files(&self, extracted_dir: &Path, runtime_dir: &Path) -> Result<()> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(extracted_dir).fs_context("reading", extracted_dir)? {
            entries.push(entry.fs_context("reading", extracted_dir)?.path());
        }
        let payload = match entries.as_slice() {
            [single] if single.is_dir() => {
                let jre = single.join("jre");
                if jre.is_dir() { jre } else { single.clone() }
            }
            _ => extracted_dir.to_path_buf(),
        };
        log::debug!("selecting runtime files from {}", payload.display());
        copy_tree_blocking(&payload, runtime_dir)
    }
}
