//! On-disk cache of provisioned runtimes.

use crate::config::Platform;
use crate::error::{FsContext, Result};
use crate::util::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Platform-keyed runtime cache.
///
/// Layout under the cache root, with `<key>` the platform key:
///
/// ```text
/// <key>/                  committed runtime tree
/// <key>-checksum.dat      freshness token of the committed tree
/// <key>.staging/          population in progress, renamed over the slot
/// <key>.archive.<ext>     scratch download
/// <key>.extract/          scratch extraction
/// ```
///
/// Scratch and staging paths carry the platform key so different platforms
/// can populate in parallel.
#[derive(Debug, Clone)]
pub struct RuntimeCache {
    root: PathBuf,
}

impl RuntimeCache {
    /// A cache rooted at `root`. Nothing is created until first use.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The cache root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The committed runtime tree for a platform.
    pub fn slot(&self, platform: Platform) -> PathBuf {
        self.root.join(platform.key())
    }

    /// The freshness token file for a platform.
    pub fn token_file(&self, platform: Platform) -> PathBuf {
        self.root.join(format!("{}-checksum.dat", platform.key()))
    }

    pub(crate) fn staging_dir(&self, platform: Platform) -> PathBuf {
        self.root.join(format!("{}.staging", platform.key()))
    }

    pub(crate) fn archive_file(&self, platform: Platform, extension: &str) -> PathBuf {
        self.root
            .join(format!("{}.archive.{extension}", platform.key()))
    }

    pub(crate) fn extract_dir(&self, platform: Platform) -> PathBuf {
        self.root.join(format!("{}.extract", platform.key()))
    }

    /// True when the platform's slot directory exists.
    pub async fn slot_exists(&self, platform: Platform) -> Result<bool> {
        let slot = self.slot(platform);
        tokio::fs::try_exists(&slot).await.fs_context("reading", &slot)
    }

    /// The committed token, if one has been persisted.
    pub async fn read_token(&self, platform: Platform) -> Result<Option<String>> {
        let path = self.token_file(platform);
        match tokio::fs::read_to_string(&path).await {
            Ok(token) => Ok(Some(token)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).fs_context("reading", &path),
        }
    }

    /// Removes a platform's slot and token.
    pub async fn clear(&self, platform: Platform) -> Result<()> {
        fs::remove_dir_all(&self.slot(platform)).await?;
        fs::remove_file(&self.token_file(platform)).await
    }

    /// Renames the populated staging directory over the slot, then persists
    /// the token.
    ///
    /// The token is written last: a crash in between leaves a tokenless
    /// slot, which the next build treats as stale.
    pub(crate) async fn commit(&self, platform: Platform, token: Option<&str>) -> Result<()> {
        let slot = self.slot(platform);
        fs::remove_dir_all(&slot).await?;
        tokio::fs::rename(self.staging_dir(platform), &slot)
            .await
            .fs_context("renaming", &slot)?;
        if let Some(token) = token {
            let path = self.token_file(platform);
            tokio::fs::write(&path, token).await.fs_context("writing", &path)?;
        }
        Ok(())
    }

    /// Deletes any scratch and staging paths left by a population run.
    pub(crate) async fn clean_scratch(&self, platform: Platform) -> Result<()> {
        fs::remove_dir_all(&self.staging_dir(platform)).await?;
        fs::remove_dir_all(&self.extract_dir(platform)).await?;
        for extension in ["tar.gz", "zip"] {
            fs::remove_file(&self.archive_file(platform, extension)).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn paths_are_keyed_by_platform() {
        let cache = RuntimeCache::new("/work/jre-cache");
        assert_eq!(
            cache.slot(Platform::Linux64),
            Path::new("/work/jre-cache/linux64")
        );
        assert_eq!(
            cache.token_file(Platform::Windows64),
            Path::new("/work/jre-cache/windows64-checksum.dat")
        );
        assert_eq!(
            cache.archive_file(Platform::MacOs64, "tar.gz"),
            Path::new("/work/jre-cache/macos64.archive.tar.gz")
        );
    }

    #[tokio::test]
    async fn missing_token_reads_as_none() {
        let tmp = TempDir::new().unwrap();
        let cache = RuntimeCache::new(tmp.path());
        assert_eq!(cache.read_token(Platform::Linux64).await.unwrap(), None);
        assert!(!cache.slot_exists(Platform::Linux64).await.unwrap());
    }

    #[tokio::test]
    async fn commit_renames_staging_and_persists_the_token() {
        let tmp = TempDir::new().unwrap();
        let cache = RuntimeCache::new(tmp.path());
        let staging = cache.staging_dir(Platform::Linux64);
        std::fs::create_dir_all(staging.join("bin")).unwrap();
        std::fs::write(staging.join("bin/java"), "java").unwrap();

        cache.commit(Platform::Linux64, Some("token-1")).await.unwrap();

        assert!(cache.slot(Platform::Linux64).join("bin/java").is_file());
        assert!(!staging.exists());
        assert_eq!(
            cache.read_token(Platform::Linux64).await.unwrap().as_deref(),
            Some("token-1")
        );
    }

    #[tokio::test]
    async fn clear_removes_slot_and_token() {
        let tmp = TempDir::new().unwrap();
        let cache = RuntimeCache::new(tmp.path());
        std::fs::create_dir_all(cache.slot(Platform::Linux64)).unwrap();
        std::fs::write(cache.token_file(Platform::Linux64), "token").unwrap();

        cache.clear(Platform::Linux64).await.unwrap();

        assert!(!cache.slot_exists(Platform::Linux64).await.unwrap());
        assert_eq!(cache.read_token(Platform::Linux64).await.unwrap(), None);

        // Idempotent on an already-empty cache.
        cache.clear(Platform::Linux64).await.unwrap();
    }
}
