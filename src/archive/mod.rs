//! Archive extraction and creation.
//!
//! One extraction and one compression entry point, dispatching on
//! [`ArchiveFormat`]. The blocking tar/zip work runs on the dedicated
//! thread pool. Extraction refuses entries that would land outside the
//! destination directory.

use crate::error::{Error, FsContext, Result};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Component, Path};
use std::str::FromStr;
use walkdir::WalkDir;

/// The archive container formats the engine can read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArchiveFormat {
    /// Gzip-compressed tarball.
    #[serde(rename = "tar.gz")]
    TarGz,
    /// Zip archive.
    #[serde(rename = "zip")]
    Zip,
}

impl ArchiveFormat {
    /// File extension for this format, without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::TarGz => "tar.gz",
            Self::Zip => "zip",
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ArchiveFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "tar.gz" | "tgz" => Ok(Self::TarGz),
            "zip" => Ok(Self::Zip),
            other => Err(Error::config(format!(
                "unknown archive format {other:?}, expected one of: tar.gz, zip"
            ))),
        }
    }
}

/// Extracts `archive` into `dest`, creating `dest` as necessary.
///
/// Entries whose paths or link targets would escape `dest` are skipped with
/// a warning rather than written. Unix permission bits are preserved.
pub async fn extract(archive: &Path, format: ArchiveFormat, dest: &Path) -> Result<()> {
    let archive_owned = archive.to_path_buf();
    let dest = dest.to_path_buf();
    tokio::task::spawn_blocking(move || match format {
        ArchiveFormat::TarGz => extract_tar_gz(&archive_owned, &dest),
        ArchiveFormat::Zip => extract_zip(&archive_owned, &dest),
    })
    .await
    .map_err(|e| Error::archive(archive, format!("extract task panicked: {e}")))?
}

/// Packs the directory `src_dir` into `dest`.
///
/// The archive's sole top-level entry is the directory's own name, so
/// unpacking always yields a single folder regardless of format.
pub async fn compress(src_dir: &Path, format: ArchiveFormat, dest: &Path) -> Result<()> {
    let src = src_dir.to_path_buf();
    let root_name = src_dir
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_owned)
        .ok_or_else(|| Error::archive(src_dir, "directory has no usable name"))?;
    let dest_owned = dest.to_path_buf();
    tokio::task::spawn_blocking(move || match format {
        ArchiveFormat::TarGz => compress_tar_gz(&src, &root_name, &dest_owned),
        ArchiveFormat::Zip => compress_zip(&src, &root_name, &dest_owned),
    })
    .await
    .map_err(|e| Error::archive(dest, format!("compress task panicked: {e}")))?
}

fn extract_tar_gz(archive_path: &Path, dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest).fs_context("creating", dest)?;
    let file = File::open(archive_path).fs_context("opening", archive_path)?;
    let mut archive = tar::Archive::new(GzDecoder::new(BufReader::new(file)));
    archive.set_preserve_permissions(true);

    let entries = archive
        .entries()
        .map_err(|e| Error::archive(archive_path, e))?;
    for entry in entries {
        let mut entry = entry.map_err(|e| Error::archive(archive_path, e))?;
        let entry_path = entry
            .path()
            .map_err(|e| Error::archive(archive_path, e))?
            .into_owned();
        let link_target = entry
            .link_name()
            .map_err(|e| Error::archive(archive_path, e))?
            .map(|t| t.into_owned());
        if let Some(target) = link_target {
            if link_escapes(&entry_path, &target) {
                log::warn!(
                    "skipping link {} -> {}: target escapes the destination",
                    entry_path.display(),
                    target.display()
                );
                continue;
            }
        }
        let unpacked = entry
            .unpack_in(dest)
            .map_err(|e| Error::archive(archive_path, e))?;
        if !unpacked {
            log::warn!(
                "skipping entry {}: path escapes the destination",
                entry_path.display()
            );
        }
    }
    Ok(())
}

/// True when a link at `entry_path` pointing to `target` would resolve
/// above the extraction root.
fn link_escapes(entry_path: &Path, target: &Path) -> bool {
    if target.is_absolute() {
        return true;
    }
    let mut depth = entry_path
        .parent()
        .map(|p| p.components().count() as i64)
        .unwrap_or(0);
    for component in target.components() {
        match component {
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return true;
                }
            }
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            _ => return true,
        }
    }
    false
}

fn extract_zip(archive_path: &Path, dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest).fs_context("creating", dest)?;
    let file = File::open(archive_path).fs_context("opening", archive_path)?;
    let mut archive =
        zip::ZipArchive::new(BufReader::new(file)).map_err(|e| Error::archive(archive_path, e))?;

    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .map_err(|e| Error::archive(archive_path, e))?;
        let Some(rel) = entry.enclosed_name() else {
            log::warn!(
                "skipping entry {}: path escapes the destination",
                entry.name()
            );
            continue;
        };
        let out_path = dest.join(rel);
        if entry.is_dir() {
            std::fs::create_dir_all(&out_path).fs_context("creating", &out_path)?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).fs_context("creating", parent)?;
        }
        let mut out = File::create(&out_path).fs_context("creating", &out_path)?;
        io::copy(&mut entry, &mut out).fs_context("writing", &out_path)?;
        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&out_path, std::fs::Permissions::from_mode(mode))
                .fs_context("writing", &out_path)?;
        }
    }
    Ok(())
}

fn compress_tar_gz(src: &Path, root_name: &str, dest: &Path) -> Result<()> {
    let metadata = std::fs::metadata(src).fs_context("reading", src)?;
    if !metadata.is_dir() {
        return Err(Error::archive(src, "not a directory"));
    }

    let file = File::create(dest).fs_context("creating", dest)?;
    let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(false);
    builder
        .append_dir_all(root_name, src)
        .map_err(|e| Error::archive(dest, e))?;
    let encoder = builder.into_inner().map_err(|e| Error::archive(dest, e))?;
    let mut inner = encoder.finish().map_err(|e| Error::archive(dest, e))?;
    inner.flush().fs_context("writing", dest)?;
    Ok(())
}

fn compress_zip(src: &Path, root_name: &str, dest: &Path) -> Result<()> {
    let metadata = std::fs::metadata(src).fs_context("reading", src)?;
    if !metadata.is_dir() {
        return Err(Error::archive(src, "not a directory"));
    }

    let file = File::create(dest).fs_context("creating", dest)?;
    let mut writer = zip::ZipWriter::new(BufWriter::new(file));
    writer
        .add_directory(root_name, entry_options(0o755))
        .map_err(|e| Error::archive(dest, e))?;

    // Zip has no portable symlink story; follow links and store the content.
    for entry in WalkDir::new(src).follow_links(true).sort_by_file_name() {
        let entry = entry.fs_context("walking", src)?;
        let rel = match entry.path().strip_prefix(src) {
            Ok(rel) if !rel.as_os_str().is_empty() => rel,
            _ => continue,
        };
        let name = zip_entry_name(root_name, rel);
        let mode = unix_mode_of(&entry)?;
        if entry.file_type().is_dir() {
            writer
                .add_directory(name, entry_options(mode))
                .map_err(|e| Error::archive(dest, e))?;
        } else {
            writer
                .start_file(name, entry_options(mode))
                .map_err(|e| Error::archive(dest, e))?;
            let mut input = File::open(entry.path()).fs_context("opening", entry.path())?;
            io::copy(&mut input, &mut writer).fs_context("writing", dest)?;
        }
    }
    let mut inner = writer.finish().map_err(|e| Error::archive(dest, e))?;
    inner.flush().fs_context("writing", dest)?;
    Ok(())
}

fn entry_options(mode: u32) -> zip::write::SimpleFileOptions {
    zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(mode & 0o777)
}

#[cfg(unix)]
fn unix_mode_of(entry: &walkdir::DirEntry) -> Result<u32> {
    use std::os::unix::fs::PermissionsExt;
    let metadata = entry.metadata().fs_context("reading", entry.path())?;
    Ok(metadata.permissions().mode())
}

#[cfg(not(unix))]
fn unix_mode_of(entry: &walkdir::DirEntry) -> Result<u32> {
    Ok(if entry.file_type().is_dir() {
        0o755
    } else {
        0o644
    })
}

fn zip_entry_name(root: &str, rel: &Path) -> String {
    let mut name = String::from(root);
    for component in rel.components() {
        name.push('/');
        name.push_str(&component.as_os_str().to_string_lossy());
    }
    name
}
