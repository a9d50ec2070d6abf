//! MD5 digests and checksum sidecar files.
//!
//! Two sidecar conventions exist, matching what downstream repository
//! consumers expect:
//! - per-package archives: `<digest> *<filename>` (BSD-style binary marker)
//! - the manifest: `<digest>  <filename>` (two spaces)

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use md5::{Digest, Md5};

use crate::error::{SyncError, SyncResult};

/// Buffer size for reading files during checksum calculation (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Extension appended to the checksummed file's name for its sidecar.
pub const SIDECAR_EXTENSION: &str = "md5";

/// Calculate the MD5 digest of a byte slice as lowercase hex.
pub fn md5_hex(bytes: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Calculate the MD5 digest of a file as lowercase hex.
///
/// # Errors
///
/// Returns an error if the file cannot be read.
pub fn file_md5(path: &Path) -> SyncResult<String> {
    let mut file = File::open(path).map_err(|e| SyncError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut hasher = Md5::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer).map_err(|e| SyncError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

        if bytes_read == 0 {
            break;
        }

        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Write the per-package sidecar next to an archive.
///
/// The sidecar is `<archive>.md5` containing `<digest> *<filename>`.
/// Returns the sidecar path.
pub fn write_archive_sidecar(archive_path: &Path, digest: &str) -> SyncResult<PathBuf> {
    let filename = file_name(archive_path);
    let sidecar = sidecar_path(archive_path);

    fs::write(&sidecar, format!("{} *{}", digest, filename)).map_err(|e| {
        SyncError::WriteFailed {
            path: sidecar.clone(),
            source: e,
        }
    })?;

    Ok(sidecar)
}

/// Write the manifest-level sidecar next to the manifest.
///
/// The sidecar is `<manifest>.md5` containing `<digest>  <filename>`
/// (two spaces, the coreutils `md5sum` text convention).
/// Returns the sidecar path.
pub fn write_manifest_sidecar(manifest_path: &Path, digest: &str) -> SyncResult<PathBuf> {
    let filename = file_name(manifest_path);
    let sidecar = sidecar_path(manifest_path);

    fs::write(&sidecar, format!("{}  {}", digest, filename)).map_err(|e| {
        SyncError::WriteFailed {
            path: sidecar.clone(),
            source: e,
        }
    })?;

    Ok(sidecar)
}

fn sidecar_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(SIDECAR_EXTENSION);
    PathBuf::from(name)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string()
}
