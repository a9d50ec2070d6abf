//! Sync driver: per-project fetch/skip/import/merge orchestration.
//!
//! For each configured project the driver resolves the latest published
//! release, skips it when its archive is already on disk, and otherwise
//! downloads, imports, and merges it into the manifest. Projects are
//! processed strictly one after another; the manifest is held in memory
//! across the run and written once at the end, together with its
//! checksum sidecar.
//!
//! Archive existence is the sole already-fetched marker. A present
//! archive is never re-fetched even when a newer release exists upstream
//! under a different tag than the one recorded on disk.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::checksum::{md5_hex, write_archive_sidecar, write_manifest_sidecar};
use crate::config::ProjectRef;
use crate::error::{SyncError, SyncResult};
use crate::github::ReleaseSource;
use crate::importer::import_archive;
use crate::index::{AddonIndex, MANIFEST_FILENAME};

/// Failure isolation policy for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorPolicy {
    /// Abort the whole run on the first project failure; the manifest is
    /// not rewritten. This is the default.
    #[default]
    FailFast,

    /// Record the failure and continue with the remaining projects; the
    /// manifest is still written with whatever merged successfully.
    Continue,
}

/// Outcome of processing a single project.
#[derive(Debug, Clone)]
pub enum ProjectOutcome {
    /// The archive was already on disk; nothing was fetched and the
    /// manifest entry was left untouched.
    Skipped {
        /// Archive filename that was found on disk.
        filename: String,
    },

    /// The release was downloaded, imported, and merged.
    Fetched {
        /// Version string derived from the release tag.
        version: String,

        /// Bytes downloaded.
        bytes: u64,

        /// MD5 digest of the downloaded archive.
        checksum: String,
    },

    /// The project failed; only recorded under [`ErrorPolicy::Continue`].
    Failed {
        /// Rendered error.
        reason: String,
    },
}

impl fmt::Display for ProjectOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectOutcome::Skipped { filename } => write!(f, "up to date ({})", filename),
            ProjectOutcome::Fetched { version, bytes, .. } => {
                write!(f, "fetched {} ({} bytes)", version, bytes)
            }
            ProjectOutcome::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

/// Result of a full run.
#[derive(Debug)]
pub struct SyncSummary {
    /// Per-project outcomes in configuration order.
    pub outcomes: Vec<(ProjectRef, ProjectOutcome)>,

    /// Path of the written manifest.
    pub manifest_path: PathBuf,

    /// MD5 digest of the written manifest text.
    pub manifest_checksum: String,
}

impl SyncSummary {
    /// Number of projects that were fetched.
    pub fn fetched(&self) -> usize {
        self.count(|o| matches!(o, ProjectOutcome::Fetched { .. }))
    }

    /// Number of projects that were skipped.
    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ProjectOutcome::Skipped { .. }))
    }

    /// Number of projects that failed.
    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, ProjectOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&ProjectOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}

/// Orchestrates a repository build run against any [`ReleaseSource`].
#[derive(Debug)]
pub struct SyncDriver<S> {
    source: S,
    public_dir: PathBuf,
    policy: ErrorPolicy,
}

impl<S: ReleaseSource> SyncDriver<S> {
    /// Create a driver writing into `public_dir`, failing fast by default.
    pub fn new(source: S, public_dir: impl Into<PathBuf>) -> Self {
        Self {
            source,
            public_dir: public_dir.into(),
            policy: ErrorPolicy::FailFast,
        }
    }

    /// Set the failure isolation policy.
    pub fn with_policy(mut self, policy: ErrorPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Process all projects, then write the manifest and its sidecar.
    ///
    /// # Errors
    ///
    /// Under [`ErrorPolicy::FailFast`], the first project failure aborts
    /// the run before the manifest is rewritten. Manifest load/write
    /// failures are always fatal.
    pub fn run(&self, projects: &[ProjectRef]) -> SyncResult<SyncSummary> {
        fs::create_dir_all(&self.public_dir).map_err(|e| SyncError::CreateDirFailed {
            path: self.public_dir.clone(),
            source: e,
        })?;

        let manifest_path = self.public_dir.join(MANIFEST_FILENAME);
        let mut index = AddonIndex::load(&manifest_path)?;
        let mut outcomes = Vec::with_capacity(projects.len());

        for project in projects {
            match self.sync_project(project, &mut index) {
                Ok(outcome) => {
                    info!(project = %project, outcome = %outcome, "project processed");
                    outcomes.push((project.clone(), outcome));
                }
                Err(e) => match self.policy {
                    ErrorPolicy::FailFast => return Err(e),
                    ErrorPolicy::Continue => {
                        warn!(project = %project, error = %e, "project failed, continuing");
                        outcomes.push((
                            project.clone(),
                            ProjectOutcome::Failed {
                                reason: e.to_string(),
                            },
                        ));
                    }
                },
            }
        }

        let manifest_checksum = self.write_manifest(&index, &manifest_path)?;
        info!(
            manifest = %manifest_path.display(),
            checksum = %manifest_checksum,
            entries = index.len(),
            "manifest written"
        );

        Ok(SyncSummary {
            outcomes,
            manifest_path,
            manifest_checksum,
        })
    }

    /// Process one project: skip, or fetch + import + merge.
    fn sync_project(
        &self,
        project: &ProjectRef,
        index: &mut AddonIndex,
    ) -> SyncResult<ProjectOutcome> {
        let releases = self.source.releases(project)?;

        // Index 0 is the latest release; the host's newest-first ordering
        // is trusted, no version comparison is performed.
        let release = releases.first().ok_or_else(|| SyncError::NoReleases {
            owner: project.owner.clone(),
            name: project.name.clone(),
        })?;

        let version = tag_version(&release.tag_name);
        let asset = release.assets.first().ok_or_else(|| SyncError::NoAssets {
            owner: project.owner.clone(),
            name: project.name.clone(),
            tag: release.tag_name.clone(),
        })?;

        let filename = archive_filename(&project.name, &version);
        let addon_dir = self.public_dir.join(&project.name);
        let archive_path = addon_dir.join(&filename);

        if archive_path.exists() {
            return Ok(ProjectOutcome::Skipped { filename });
        }

        // The download step creates the addon directory.
        let downloaded = self
            .source
            .download(&asset.browser_download_url, &archive_path)?;
        write_archive_sidecar(&archive_path, &downloaded.md5)?;

        let metadata = import_archive(&archive_path, &project.name, &addon_dir)?;
        index.replace(&metadata.id, metadata.subtree());

        Ok(ProjectOutcome::Fetched {
            version,
            bytes: downloaded.bytes,
            checksum: downloaded.md5,
        })
    }

    /// Serialize the index, write the manifest, and write its sidecar.
    ///
    /// The sidecar digest is computed from the exact text written.
    fn write_manifest(&self, index: &AddonIndex, manifest_path: &Path) -> SyncResult<String> {
        let xml = index.to_xml();

        fs::write(manifest_path, &xml).map_err(|e| SyncError::WriteFailed {
            path: manifest_path.to_path_buf(),
            source: e,
        })?;

        let digest = md5_hex(xml.as_bytes());
        write_manifest_sidecar(manifest_path, &digest)?;

        Ok(digest)
    }
}

/// Version string derived from a release tag: the tag minus its leading
/// character, per the `v`-prefix tagging convention (`v2.0` becomes `2.0`).
pub fn tag_version(tag: &str) -> String {
    let mut chars = tag.chars();
    chars.next();
    chars.as_str().to_string()
}

/// Archive filename for a project release: `<name>-<version>.zip`.
pub fn archive_filename(name: &str, version: &str) -> String {
    format!("{}-{}.zip", name, version)
}
