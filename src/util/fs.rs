//! File system helpers for tree assembly.
//!
//! Safe copy and directory operations with automatic parent creation,
//! symlink preservation, and path-carrying errors. Blocking tree walks run
//! on the dedicated thread pool.

use crate::error::{Error, FsContext, Result};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Creates all of the directories of the specified path, erasing it first
/// if requested.
///
/// With `erase` the previous tree is removed entirely, giving the
/// delete-then-create semantics the packaging pipeline relies on.
pub async fn create_dir_all(path: &Path, erase: bool) -> Result<()> {
    if erase {
        remove_dir_all(path).await?;
    }
    fs::create_dir_all(path)
        .await
        .fs_context("creating", path)
}

/// Removes a directory tree if it exists. Idempotent.
pub async fn remove_dir_all(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).fs_context("removing", path),
    }
}

/// Removes a file if it exists. Idempotent.
pub async fn remove_file(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).fs_context("removing", path),
    }
}

/// Copies a regular file, creating any parent directories of the
/// destination as necessary.
///
/// Fails if the source is a directory or does not exist.
pub async fn copy_file(from: &Path, to: &Path) -> Result<()> {
    let metadata = fs::metadata(from).await.fs_context("reading", from)?;
    if !metadata.is_file() {
        return Err(Error::Filesystem {
            op: "copying",
            path: from.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
        });
    }
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)
            .await
            .fs_context("creating", parent)?;
    }
    fs::copy(from, to).await.fs_context("copying to", to)?;
    Ok(())
}

/// Recursively copies the contents of `from` into `to`, creating `to` and
/// any missing parents. Existing files in `to` are overwritten; extra files
/// already present in `to` are left alone.
///
/// Symlinks are preserved as symlinks.
pub async fn copy_dir_contents(from: &Path, to: &Path) -> Result<()> {
    let metadata = fs::metadata(from).await.fs_context("reading", from)?;
    if !metadata.is_dir() {
        return Err(Error::Filesystem {
            op: "copying",
            path: from.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "not a directory"),
        });
    }

    let from = from.to_path_buf();
    let to = to.to_path_buf();
    tokio::task::spawn_blocking(move || copy_tree_blocking(&from, &to))
        .await
        .map_err(|e| Error::Filesystem {
            op: "copying",
            path: PathBuf::new(),
            source: io::Error::other(format!("copy task panicked: {e}")),
        })?
}

/// Blocking core of [`copy_dir_contents`]. Usable from
/// [`RuntimeSource::select_files`](crate::runtime::RuntimeSource::select_files)
/// implementations, which run on the blocking pool.
pub fn copy_tree_blocking(from: &Path, to: &Path) -> Result<()> {
    std::fs::create_dir_all(to).fs_context("creating", to)?;
    for entry in walkdir::WalkDir::new(from) {
        let entry = entry.fs_context("walking", from)?;
        let rel = entry
            .path()
            .strip_prefix(from)
            .map_err(|_| Error::Filesystem {
                op: "walking",
                path: entry.path().to_path_buf(),
                source: io::Error::other("entry escaped its root"),
            })?;
        if rel.as_os_str().is_empty() {
            continue;
        }
        let dest = to.join(rel);

        if entry.path_is_symlink() {
            let target = std::fs::read_link(entry.path()).fs_context("reading", entry.path())?;
            // Replace any previous entry so reruns stay idempotent.
            let _ = std::fs::remove_file(&dest);
            if entry.path().is_dir() {
                symlink_dir(&target, &dest).fs_context("linking", &dest)?;
            } else {
                symlink_file(&target, &dest).fs_context("linking", &dest)?;
            }
        } else if entry.file_type().is_dir() {
            std::fs::create_dir_all(&dest).fs_context("creating", &dest)?;
        } else {
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent).fs_context("creating", parent)?;
            }
            std::fs::copy(entry.path(), &dest).fs_context("copying to", &dest)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn symlink_dir(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

#[cfg(windows)]
fn symlink_dir(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(src, dst)
}

#[cfg(unix)]
fn symlink_file(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(src, dst)
}

#[cfg(windows)]
fn symlink_file(src: &Path, dst: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(src, dst)
}
