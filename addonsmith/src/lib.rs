//! Addonsmith - addon repository builder
//!
//! This library builds a static addon repository from upstream GitHub
//! projects: it fetches each project's latest release archive, verifies
//! and records MD5 checksums, extracts the addon descriptor and assets,
//! and maintains the merged `addons.xml` manifest that addon clients
//! consume.

pub mod checksum;
pub mod config;
pub mod error;
pub mod github;
pub mod importer;
pub mod index;
pub mod metadata;
pub mod sync;

pub use config::{ProjectRef, RepoConfig};
pub use error::{SyncError, SyncResult};
pub use github::{GithubClient, ReleaseSource};
pub use index::AddonIndex;
pub use metadata::AddonMetadata;
pub use sync::{ErrorPolicy, SyncDriver, SyncSummary};

/// Library version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
