//! Runtime materialization: cache lookup, download, selection, install.

use super::cache::RuntimeCache;
use super::source::RuntimeSource;
use crate::archive::{self, ArchiveFormat};
use crate::config::Platform;
use crate::error::{Error, FsContext, Result};
use crate::util::checksum;
use crate::util::fs;
use crate::util::http::{self, HttpClient};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use url::Url;

/// One lock per platform so different platforms can provision in parallel
/// while two builds of the same platform never race on its cache slot.
struct PlatformLocks {
    linux64: Mutex<()>,
    windows64: Mutex<()>,
    macos64: Mutex<()>,
}

impl PlatformLocks {
    fn new() -> Self {
        Self {
            linux64: Mutex::new(()),
            windows64: Mutex::new(()),
            macos64: Mutex::new(()),
        }
    }

    fn get(&self, platform: Platform) -> &Mutex<()> {
        match platform {
            Platform::Linux64 => &self.linux64,
            Platform::Windows64 => &self.windows64,
            Platform::MacOs64 => &self.macos64,
        }
    }
}

/// Materializes platform runtimes into distribution trees, backed by the
/// cache.
pub struct RuntimeProvisioner {
    source: Arc<dyn RuntimeSource>,
    cache: RuntimeCache,
    http: HttpClient,
    locks: PlatformLocks,
}

impl RuntimeProvisioner {
    /// A provisioner drawing from `source` and caching under `cache`.
    pub fn new(
        source: Arc<dyn RuntimeSource>,
        cache: RuntimeCache,
        http_timeout: Option<Duration>,
    ) -> Result<Self> {
        Ok(Self {
            source,
            cache,
            http: HttpClient::new(http_timeout)?,
            locks: PlatformLocks::new(),
        })
    }

    /// The cache backing this provisioner.
    pub fn cache(&self) -> &RuntimeCache {
        &self.cache
    }

    /// Ensures `target_dir` holds the platform's runtime, replacing whatever
    /// was there.
    ///
    /// Archived runtimes go through the cache: a fresh slot is copied as-is,
    /// a stale or missing one is populated first. Unpacked runtimes
    /// ([`RuntimeArchiveKind::None`](super::RuntimeArchiveKind::None)) refresh
    /// the slot from their local directory on every build; no freshness token
    /// is recorded for them.
    pub async fn materialize(&self, platform: Platform, target_dir: &Path) -> Result<()> {
        let download = self.source.runtime_url(platform);

        let _guard = self.locks.get(platform).lock().await;
        let slot = match download.kind.archive_format() {
            Some(format) => self.ensure_cached(platform, &download.url, format).await?,
            None => self.refresh_from_local(platform, &download.url).await?,
        };
        log::debug!(
            "installing {platform} runtime into {}",
            target_dir.display()
        );
        fs::create_dir_all(target_dir, true).await?;
        fs::copy_dir_contents(&slot, target_dir).await
    }

    /// Repopulates the slot from an unpacked local runtime, no network and
    /// no extraction involved.
    async fn refresh_from_local(&self, platform: Platform, raw_url: &str) -> Result<PathBuf> {
        let url = Url::parse(raw_url)
            .map_err(|e| Error::config(format!("invalid runtime URL {raw_url}: {e}")))?;
        if url.scheme() != "file" {
            return Err(Error::config(format!(
                "an unpacked runtime must be a local directory, got {raw_url}"
            )));
        }
        let dir = http::file_url_path(&url)?;
        let metadata = tokio::fs::metadata(&dir).await.fs_context("reading", &dir)?;
        if !metadata.is_dir() {
            return Err(Error::config(format!(
                "unpacked runtime {} is not a directory",
                dir.display()
            )));
        }

        log::info!("copying unpacked runtime from {}", dir.display());
        self.cache.clear(platform).await?;
        self.cache.clean_scratch(platform).await?;
        self.select_into_staging(platform, &dir).await?;
        self.cache.commit(platform, None).await?;
        self.cache.clean_scratch(platform).await?;
        Ok(self.cache.slot(platform))
    }

    /// Returns the cache slot for `platform`, populating it first when the
    /// freshness token is missing, stale, or unavailable.
    async fn ensure_cached(
        &self,
        platform: Platform,
        url: &str,
        format: ArchiveFormat,
    ) -> Result<PathBuf> {
        let slot = self.cache.slot(platform);
        let fetched_token = match self.source.checksum_url(platform) {
            Some(checksum_url) => Some(self.http.fetch_text(&checksum_url).await?),
            None => None,
        };

        if let Some(fetched) = &fetched_token {
            let fresh = self.cache.slot_exists(platform).await?
                && self.cache.read_token(platform).await?.as_deref() == Some(fetched.as_str());
            if fresh {
                log::debug!("runtime cache hit for {platform}");
                return Ok(slot);
            }
            log::info!("runtime cache stale or empty for {platform}");
        } else {
            log::info!("{platform} runtime source has no checksum URL, downloading unconditionally");
        }

        self.populate(platform, url, format, fetched_token.as_deref())
            .await?;
        Ok(slot)
    }

    async fn populate(
        &self,
        platform: Platform,
        url: &str,
        format: ArchiveFormat,
        token: Option<&str>,
    ) -> Result<()> {
        // Clearing first keeps a half-populated slot from ever pairing with
        // a valid token; the cache is an accelerator, not a source of truth.
        self.cache.clear(platform).await?;
        self.cache.clean_scratch(platform).await?;

        let archive_file = self.cache.archive_file(platform, format.extension());
        self.http.download_to(url, &archive_file).await?;

        if let Some(expected) = self.source.archive_sha256(platform) {
            let actual = checksum::sha256_of(&archive_file).await?;
            if !actual.eq_ignore_ascii_case(&expected) {
                return Err(Error::network(
                    url,
                    format!("archive digest mismatch: expected {expected}, got {actual}"),
                ));
            }
            log::debug!("archive digest verified for {platform}");
        }

        let extract_dir = self.cache.extract_dir(platform);
        fs::create_dir_all(&extract_dir, true).await?;
        archive::extract(&archive_file, format, &extract_dir).await?;

        self.select_into_staging(platform, &extract_dir).await?;
        self.cache.commit(platform, token).await?;
        self.cache.clean_scratch(platform).await?;
        log::info!("runtime cache populated for {platform}");
        Ok(())
    }

    /// Runs the source's file selection from `payload` into the staging
    /// directory, off the async runtime.
    async fn select_into_staging(&self, platform: Platform, payload: &Path) -> Result<()> {
        let staging = self.cache.staging_dir(platform);
        fs::create_dir_all(&staging, true).await?;
        let source = Arc::clone(&self.source);
        let payload = payload.to_path_buf();
        let staged = staging.clone();
        tokio::task::spawn_blocking(move || source.select_files(&payload, &staged))
            .await
            .map_err(|e| Error::Filesystem {
                op: "selecting",
                path: staging,
                source: io::Error::other(format!("selection task panicked: {e}")),
            })??;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{RuntimeArchiveKind, RuntimeDownload};
    use tempfile::TempDir;

    struct UnpackedSource {
        url: String,
    }

    impl RuntimeSource for UnpackedSource {
        fn runtime_url(&self, _platform: Platform) -> RuntimeDownload {
            RuntimeDownload {
                url: self.url.clone(),
                kind: RuntimeArchiveKind::None,
            }
        }
    }

    fn provisioner(url: &str, cache_root: &Path) -> RuntimeProvisioner {
        RuntimeProvisioner::new(
            Arc::new(UnpackedSource { url: url.into() }),
            RuntimeCache::new(cache_root),
            None,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn unpacked_runtime_is_refreshed_on_every_build() {
        let tmp = TempDir::new().unwrap();
        let local = tmp.path().join("local-jre");
        std::fs::create_dir_all(local.join("bin")).unwrap();
        std::fs::write(local.join("bin/java"), "java-1").unwrap();

        let cache_root = tmp.path().join("cache");
        let url = Url::from_file_path(&local).unwrap();
        let provisioner = provisioner(url.as_str(), &cache_root);

        let target = tmp.path().join("dist/jre");
        provisioner
            .materialize(Platform::Linux64, &target)
            .await
            .unwrap();

        assert!(target.join("bin/java").is_file());
        assert!(cache_root.join("linux64/bin/java").is_file());
        assert!(!cache_root.join("linux64-checksum.dat").exists());

        // Without a freshness token the slot never counts as current, so
        // local edits show up on the next build.
        std::fs::write(local.join("bin/java"), "java-2").unwrap();
        provisioner
            .materialize(Platform::Linux64, &target)
            .await
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(target.join("bin/java")).unwrap(),
            "java-2"
        );
    }

    #[tokio::test]
    async fn unpacked_runtime_requires_a_file_url() {
        let tmp = TempDir::new().unwrap();
        let cache_root = tmp.path().join("cache");
        let provisioner = provisioner("https://example.com/jre", &cache_root);

        let err = provisioner
            .materialize(Platform::Linux64, &tmp.path().join("jre"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Config(_)));
        assert!(!cache_root.exists());
    }

    #[tokio::test]
    async fn unpacked_runtime_must_point_at_a_directory() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("not-a-dir");
        std::fs::write(&file, "just a file").unwrap();

        let url = Url::from_file_path(&file).unwrap();
        let provisioner = provisioner(url.as_str(), &tmp.path().join("cache"));

        let err = provisioner
            .materialize(Platform::Linux64, &tmp.path().join("jre"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
