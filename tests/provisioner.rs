//! Runtime provisioning against HTTP fixtures.

use anyhow::Result;
use jredist::config::Platform;
use jredist::runtime::{
    RuntimeArchiveKind, RuntimeCache, RuntimeDownload, RuntimeProvisioner, RuntimeSource,
};
use jredist::{ArchiveFormat, Error};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

struct HttpSource {
    base: String,
    kind: RuntimeArchiveKind,
    with_checksum: bool,
    expected_sha256: Option<String>,
}

impl HttpSource {
    fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            kind: RuntimeArchiveKind::TarGz,
            with_checksum: true,
            expected_sha256: None,
        }
    }
}

impl RuntimeSource for HttpSource {
    fn runtime_url(&self, _platform: Platform) -> RuntimeDownload {
        RuntimeDownload {
            url: format!("{}/jdk.{}", self.base, self.kind),
            kind: self.kind,
        }
    }

    fn checksum_url(&self, _platform: Platform) -> Option<String> {
        self.with_checksum
            .then(|| format!("{}/checksum.txt", self.base))
    }

    fn archive_sha256(&self, _platform: Platform) -> Option<String> {
        self.expected_sha256.clone()
    }
}

/// A tiny JDK-shaped tree, compressed the same way real runtimes ship.
async fn fake_jdk_archive(scratch: &Path, marker: &str, format: ArchiveFormat) -> Result<Vec<u8>> {
    let tree = scratch.join(format!("tree-{marker}"));
    std::fs::create_dir_all(tree.join("corretto/bin"))?;
    std::fs::write(tree.join("corretto/bin/java"), format!("java-{marker}"))?;
    std::fs::write(tree.join("corretto/release"), marker)?;
    let archive = scratch.join(format!("jdk-{marker}.{}", format.extension()));
    jredist::archive::compress(&tree.join("corretto"), format, &archive).await?;
    Ok(std::fs::read(&archive)?)
}

fn provisioner(source: HttpSource, cache_root: &Path) -> RuntimeProvisioner {
    RuntimeProvisioner::new(Arc::new(source), RuntimeCache::new(cache_root), None).unwrap()
}

#[tokio::test]
async fn unchanged_checksum_downloads_the_archive_once() -> Result<()> {
    init_logs();
    let tmp = TempDir::new()?;
    let body = fake_jdk_archive(tmp.path(), "v1", ArchiveFormat::TarGz).await?;

    let mut server = mockito::Server::new_async().await;
    let checksum = server
        .mock("GET", "/checksum.txt")
        .with_body("v1")
        .expect(2)
        .create_async()
        .await;
    let archive = server
        .mock("GET", "/jdk.tar.gz")
        .with_body(body)
        .expect(1)
        .create_async()
        .await;

    let provisioner = provisioner(HttpSource::new(server.url()), &tmp.path().join("cache"));
    let first = tmp.path().join("dist-1/jre");
    provisioner.materialize(Platform::Linux64, &first).await?;
    let second = tmp.path().join("dist-2/jre");
    provisioner.materialize(Platform::Linux64, &second).await?;

    assert_eq!(
        std::fs::read_to_string(first.join("corretto/release"))?,
        "v1"
    );
    assert_eq!(
        std::fs::read_to_string(second.join("corretto/release"))?,
        "v1"
    );
    checksum.assert_async().await;
    archive.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn changed_checksum_repopulates_the_cache() -> Result<()> {
    init_logs();
    let tmp = TempDir::new()?;
    let cache_root = tmp.path().join("cache");
    let mut server = mockito::Server::new_async().await;

    let v1 = fake_jdk_archive(tmp.path(), "v1", ArchiveFormat::TarGz).await?;
    let _checksum1 = server
        .mock("GET", "/checksum.txt")
        .with_body("v1")
        .expect(1)
        .create_async()
        .await;
    let _archive1 = server
        .mock("GET", "/jdk.tar.gz")
        .with_body(v1)
        .expect(1)
        .create_async()
        .await;

    let provisioner = provisioner(HttpSource::new(server.url()), &cache_root);
    let target = tmp.path().join("dist/jre");
    provisioner.materialize(Platform::Linux64, &target).await?;
    assert_eq!(
        std::fs::read_to_string(target.join("corretto/release"))?,
        "v1"
    );

    // Later mocks take precedence, simulating a new upstream release.
    let v2 = fake_jdk_archive(tmp.path(), "v2", ArchiveFormat::TarGz).await?;
    let checksum2 = server
        .mock("GET", "/checksum.txt")
        .with_body("v2")
        .expect(1)
        .create_async()
        .await;
    let archive2 = server
        .mock("GET", "/jdk.tar.gz")
        .with_body(v2)
        .expect(1)
        .create_async()
        .await;

    provisioner.materialize(Platform::Linux64, &target).await?;
    assert_eq!(
        std::fs::read_to_string(target.join("corretto/release"))?,
        "v2"
    );
    assert_eq!(
        std::fs::read_to_string(cache_root.join("linux64-checksum.dat"))?,
        "v2"
    );
    checksum2.assert_async().await;
    archive2.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn missing_checksum_url_disables_caching() -> Result<()> {
    init_logs();
    let tmp = TempDir::new()?;
    let cache_root = tmp.path().join("cache");
    let body = fake_jdk_archive(tmp.path(), "v1", ArchiveFormat::TarGz).await?;

    let mut server = mockito::Server::new_async().await;
    let archive = server
        .mock("GET", "/jdk.tar.gz")
        .with_body(body)
        .expect(2)
        .create_async()
        .await;

    let mut source = HttpSource::new(server.url());
    source.with_checksum = false;
    let provisioner = provisioner(source, &cache_root);

    provisioner
        .materialize(Platform::Linux64, &tmp.path().join("dist-1/jre"))
        .await?;
    provisioner
        .materialize(Platform::Linux64, &tmp.path().join("dist-2/jre"))
        .await?;

    archive.assert_async().await;
    assert!(cache_root.join("linux64/corretto/bin/java").is_file());
    assert!(!cache_root.join("linux64-checksum.dat").exists());
    Ok(())
}

#[tokio::test]
async fn zip_runtime_archives_are_supported() -> Result<()> {
    init_logs();
    let tmp = TempDir::new()?;
    let body = fake_jdk_archive(tmp.path(), "v1", ArchiveFormat::Zip).await?;

    let mut server = mockito::Server::new_async().await;
    let _checksum = server
        .mock("GET", "/checksum.txt")
        .with_body("v1")
        .create_async()
        .await;
    let _archive = server
        .mock("GET", "/jdk.zip")
        .with_body(body)
        .create_async()
        .await;

    let mut source = HttpSource::new(server.url());
    source.kind = RuntimeArchiveKind::Zip;
    let provisioner = provisioner(source, &tmp.path().join("cache"));

    let target = tmp.path().join("dist/jre");
    provisioner.materialize(Platform::Windows64, &target).await?;
    assert_eq!(
        std::fs::read_to_string(target.join("corretto/bin/java"))?,
        "java-v1"
    );
    Ok(())
}

#[tokio::test]
async fn archive_digest_mismatch_aborts_without_caching() -> Result<()> {
    init_logs();
    let tmp = TempDir::new()?;
    let cache_root = tmp.path().join("cache");
    let body = fake_jdk_archive(tmp.path(), "v1", ArchiveFormat::TarGz).await?;

    let mut server = mockito::Server::new_async().await;
    let _checksum = server
        .mock("GET", "/checksum.txt")
        .with_body("v1")
        .create_async()
        .await;
    let _archive = server
        .mock("GET", "/jdk.tar.gz")
        .with_body(body)
        .create_async()
        .await;

    let mut source = HttpSource::new(server.url());
    source.expected_sha256 = Some("0".repeat(64));
    let provisioner = provisioner(source, &cache_root);

    let err = provisioner
        .materialize(Platform::Linux64, &tmp.path().join("dist/jre"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Network { .. }));
    assert!(!cache_root.join("linux64").exists());
    assert!(!cache_root.join("linux64-checksum.dat").exists());
    Ok(())
}

#[tokio::test]
async fn matching_archive_digest_is_accepted() -> Result<()> {
    init_logs();
    let tmp = TempDir::new()?;
    let body = fake_jdk_archive(tmp.path(), "v1", ArchiveFormat::TarGz).await?;
    let on_disk = tmp.path().join("expected.tar.gz");
    std::fs::write(&on_disk, &body)?;
    let digest = jredist::util::checksum::sha256_of(&on_disk).await?;

    let mut server = mockito::Server::new_async().await;
    let _checksum = server
        .mock("GET", "/checksum.txt")
        .with_body("v1")
        .create_async()
        .await;
    let _archive = server
        .mock("GET", "/jdk.tar.gz")
        .with_body(body)
        .create_async()
        .await;

    let mut source = HttpSource::new(server.url());
    source.expected_sha256 = Some(digest);
    let provisioner = provisioner(source, &tmp.path().join("cache"));

    let target = tmp.path().join("dist/jre");
    provisioner.materialize(Platform::Linux64, &target).await?;
    assert!(target.join("corretto/bin/java").is_file());
    Ok(())
}

#[tokio::test]
async fn unpacked_kind_with_remote_url_is_rejected_before_any_request() -> Result<()> {
    init_logs();
    let tmp = TempDir::new()?;
    let mut server = mockito::Server::new_async().await;
    let untouched = server
        .mock("GET", mockito::Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    struct RemoteUnpacked {
        base: String,
    }

    impl RuntimeSource for RemoteUnpacked {
        fn runtime_url(&self, _platform: Platform) -> RuntimeDownload {
            RuntimeDownload {
                url: format!("{}/jre-dir", self.base),
                kind: RuntimeArchiveKind::None,
            }
        }

        fn checksum_url(&self, _platform: Platform) -> Option<String> {
            Some(format!("{}/checksum.txt", self.base))
        }
    }

    let provisioner = RuntimeProvisioner::new(
        Arc::new(RemoteUnpacked { base: server.url() }),
        RuntimeCache::new(tmp.path().join("cache")),
        None,
    )?;

    let err = provisioner
        .materialize(Platform::Linux64, &tmp.path().join("dist/jre"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    untouched.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn download_failure_leaves_a_fresh_cache_untouched() -> Result<()> {
    init_logs();
    let tmp = TempDir::new()?;
    let cache_root = tmp.path().join("cache");
    let body = fake_jdk_archive(tmp.path(), "v1", ArchiveFormat::TarGz).await?;

    let mut server = mockito::Server::new_async().await;
    let _checksum = server
        .mock("GET", "/checksum.txt")
        .with_body("v1")
        .create_async()
        .await;
    let _archive = server
        .mock("GET", "/jdk.tar.gz")
        .with_body(body)
        .create_async()
        .await;

    let provisioner = provisioner(HttpSource::new(server.url()), &cache_root);
    provisioner
        .materialize(Platform::Linux64, &tmp.path().join("dist/jre"))
        .await?;

    // The checksum fetch fails outright; the committed slot must survive.
    let broken = server
        .mock("GET", "/checksum.txt")
        .with_status(500)
        .create_async()
        .await;
    let err = provisioner
        .materialize(Platform::Linux64, &tmp.path().join("dist-2/jre"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Network { .. }));
    broken.assert_async().await;

    assert!(cache_root.join("linux64/corretto/bin/java").is_file());
    assert_eq!(
        std::fs::read_to_string(cache_root.join("linux64-checksum.dat"))?,
        "v1"
    );
    Ok(())
}
