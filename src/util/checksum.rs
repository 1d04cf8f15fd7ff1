//! SHA-256 digests for built artifacts.
//!
//! Works on single files and on directory trees (directory distributions
//! have no archive file to hash). Tree digests are deterministic: files are
//! visited in sorted order and each file's relative path is hashed along
//! with its content.

use crate::error::{Error, FsContext, Result};
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Hex-encoded SHA-256 of a file or directory tree.
pub async fn sha256_of(path: &Path) -> Result<String> {
    let metadata = tokio::fs::metadata(path).await.fs_context("reading", path)?;
    if metadata.is_file() {
        sha256_of_file(path).await
    } else if metadata.is_dir() {
        sha256_of_dir(path).await
    } else {
        Err(Error::Filesystem {
            op: "hashing",
            path: path.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "neither file nor directory",
            ),
        })
    }
}

/// Total size in bytes of a file or of every file under a directory.
pub async fn size_of(path: &Path) -> Result<u64> {
    let metadata = tokio::fs::metadata(path).await.fs_context("reading", path)?;
    if metadata.is_file() {
        return Ok(metadata.len());
    }
    let root = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let mut total = 0u64;
        for entry in walkdir::WalkDir::new(&root).follow_links(false) {
            let entry = entry.fs_context("walking", &root)?;
            if entry.file_type().is_file() {
                total += entry.metadata().fs_context("reading", entry.path())?.len();
            }
        }
        Ok(total)
    })
    .await
    .map_err(|e| Error::Filesystem {
        op: "measuring",
        path: path.to_path_buf(),
        source: std::io::Error::other(format!("size task panicked: {e}")),
    })?
}

async fn sha256_of_file(path: &Path) -> Result<String> {
    let mut file = tokio::fs::File::open(path).await.fs_context("opening", path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];
    loop {
        let n = file.read(&mut buffer).await.fs_context("reading", path)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

async fn sha256_of_dir(dir: &Path) -> Result<String> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(dir).follow_links(false) {
        let entry = entry.fs_context("walking", dir)?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    files.sort();

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 8192];
    for path in files {
        if let Ok(rel) = path.strip_prefix(dir) {
            hasher.update(rel.to_string_lossy().as_bytes());
        }
        let mut file = tokio::fs::File::open(&path).await.fs_context("opening", &path)?;
        loop {
            let n = file.read(&mut buffer).await.fs_context("reading", &path)?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }
    }
    Ok(format!("{:x}", hasher.finalize()))
}
