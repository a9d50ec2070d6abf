//! Error types for the sync pipeline.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while building the addon repository.
#[derive(Debug)]
pub enum SyncError {
    /// Failed to construct the HTTP client.
    ClientBuild(String),

    /// GitHub API request failed (transport error or non-success status).
    RequestFailed { url: String, reason: String },

    /// Asset download failed.
    DownloadFailed { url: String, reason: String },

    /// Project has no published releases.
    NoReleases { owner: String, name: String },

    /// Latest release lists no downloadable assets.
    NoAssets {
        owner: String,
        name: String,
        tag: String,
    },

    /// Archive could not be opened or read.
    ArchiveFailed { path: PathBuf, reason: String },

    /// A required entry is missing from an archive.
    EntryMissing { archive: PathBuf, entry: String },

    /// Addon descriptor XML could not be parsed.
    InvalidDescriptor { reason: String },

    /// Manifest XML could not be parsed.
    InvalidManifest { path: PathBuf, reason: String },

    /// Failed to read a file.
    ReadFailed { path: PathBuf, source: io::Error },

    /// Failed to write a file.
    WriteFailed { path: PathBuf, source: io::Error },

    /// Failed to create a directory.
    CreateDirFailed { path: PathBuf, source: io::Error },
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::ClientBuild(reason) => {
                write!(f, "failed to build HTTP client: {}", reason)
            }
            SyncError::RequestFailed { url, reason } => {
                write!(f, "request to {} failed: {}", url, reason)
            }
            SyncError::DownloadFailed { url, reason } => {
                write!(f, "failed to download {}: {}", url, reason)
            }
            SyncError::NoReleases { owner, name } => {
                write!(f, "no published releases for {}/{}", owner, name)
            }
            SyncError::NoAssets { owner, name, tag } => {
                write!(
                    f,
                    "release {} of {}/{} has no downloadable assets",
                    tag, owner, name
                )
            }
            SyncError::ArchiveFailed { path, reason } => {
                write!(f, "failed to read archive {}: {}", path.display(), reason)
            }
            SyncError::EntryMissing { archive, entry } => {
                write!(
                    f,
                    "archive {} is missing entry {}",
                    archive.display(),
                    entry
                )
            }
            SyncError::InvalidDescriptor { reason } => {
                write!(f, "invalid addon descriptor: {}", reason)
            }
            SyncError::InvalidManifest { path, reason } => {
                write!(f, "invalid manifest {}: {}", path.display(), reason)
            }
            SyncError::ReadFailed { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            SyncError::WriteFailed { path, source } => {
                write!(f, "failed to write {}: {}", path.display(), source)
            }
            SyncError::CreateDirFailed { path, source } => {
                write!(
                    f,
                    "failed to create directory {}: {}",
                    path.display(),
                    source
                )
            }
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::ReadFailed { source, .. } => Some(source),
            SyncError::WriteFailed { source, .. } => Some(source),
            SyncError::CreateDirFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}
