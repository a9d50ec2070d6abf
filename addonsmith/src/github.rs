//! GitHub release client and asset downloads.
//!
//! A thin wrapper over the GitHub REST API: lists a project's published
//! releases (newest first, in the API's native ordering) and streams
//! release assets to disk while computing their MD5 digest inline, so the
//! recorded checksum always matches exactly the bytes written.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use std::time::Duration;

use md5::{Digest, Md5};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use tracing::debug;

use crate::config::ProjectRef;
use crate::error::{SyncError, SyncResult};

/// GitHub REST API base URL.
const BASE_URL: &str = "https://api.github.com";

/// Media type requested from the API.
const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

/// Pinned API version header value.
const API_VERSION: &str = "2022-11-28";

/// Timeout for HTTP requests in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 300; // 5 minutes

/// Buffer size for reading/writing during downloads (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// A published release of an upstream project.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    /// Release tag (e.g. `v2.0`).
    pub tag_name: String,

    /// Downloadable assets attached to the release.
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

/// A downloadable asset attached to a release.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    /// Asset filename.
    pub name: String,

    /// Direct download URL.
    pub browser_download_url: String,
}

/// Result of a streamed asset download.
#[derive(Debug, Clone)]
pub struct Downloaded {
    /// Total bytes written to disk.
    pub bytes: u64,

    /// MD5 hex digest of exactly the bytes written.
    pub md5: String,
}

/// Source of upstream releases and their downloadable assets.
///
/// Implemented by [`GithubClient`] for the real API; the sync driver is
/// generic over this trait so the pipeline can run against a local
/// source in tests.
pub trait ReleaseSource {
    /// List a project's published releases, newest first.
    fn releases(&self, project: &ProjectRef) -> SyncResult<Vec<Release>>;

    /// Fetch an asset to `dest`, returning its size and MD5 digest.
    fn download(&self, url: &str, dest: &Path) -> SyncResult<Downloaded>;
}

/// Blocking GitHub API client.
///
/// Constructed explicitly and passed to the operations that need it;
/// there is no shared global session.
#[derive(Debug)]
pub struct GithubClient {
    client: Client,
}

impl GithubClient {
    /// Create a client, optionally authenticating with a bearer token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not a valid header value or the
    /// underlying client cannot be built.
    pub fn new(token: Option<&str>) -> SyncResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static(API_VERSION),
        );

        if let Some(token) = token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| SyncError::ClientBuild(format!("invalid token: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .user_agent(concat!("addonsmith/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| SyncError::ClientBuild(e.to_string()))?;

        Ok(Self { client })
    }

    /// List a project's published releases.
    ///
    /// The API returns releases newest first; the ordering is passed
    /// through untouched.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, or an
    /// unparseable response body.
    pub fn releases(&self, project: &ProjectRef) -> SyncResult<Vec<Release>> {
        let url = format!(
            "{}/repos/{}/{}/releases",
            BASE_URL, project.owner, project.name
        );
        debug!(%url, "querying releases");

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| SyncError::RequestFailed {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::RequestFailed {
                url,
                reason: format!("status {}", status),
            });
        }

        let body = response.text().map_err(|e| SyncError::RequestFailed {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        serde_json::from_str(&body).map_err(|e| SyncError::RequestFailed {
            url,
            reason: format!("invalid response body: {}", e),
        })
    }

    /// Stream an asset to `dest`, computing its MD5 digest inline.
    ///
    /// The destination's parent directory is created if needed. No resume
    /// and no retry: a non-success status or transport error is fatal.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the file cannot be written.
    pub fn download(&self, url: &str, dest: &Path) -> SyncResult<Downloaded> {
        debug!(%url, dest = %dest.display(), "downloading asset");

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| SyncError::CreateDirFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut response =
            self.client
                .get(url)
                .send()
                .map_err(|e| SyncError::DownloadFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::DownloadFailed {
                url: url.to_string(),
                reason: format!("status {}", status),
            });
        }

        let file = File::create(dest).map_err(|e| SyncError::WriteFailed {
            path: dest.to_path_buf(),
            source: e,
        })?;

        let mut writer = BufWriter::new(file);
        let mut hasher = Md5::new();
        let mut buffer = vec![0u8; BUFFER_SIZE];
        let mut bytes = 0u64;

        loop {
            let bytes_read = response
                .read(&mut buffer)
                .map_err(|e| SyncError::DownloadFailed {
                    url: url.to_string(),
                    reason: format!("read error: {}", e),
                })?;

            if bytes_read == 0 {
                break;
            }

            hasher.update(&buffer[..bytes_read]);
            writer
                .write_all(&buffer[..bytes_read])
                .map_err(|e| SyncError::WriteFailed {
                    path: dest.to_path_buf(),
                    source: e,
                })?;

            bytes += bytes_read as u64;
        }

        writer.flush().map_err(|e| SyncError::WriteFailed {
            path: dest.to_path_buf(),
            source: e,
        })?;

        Ok(Downloaded {
            bytes,
            md5: format!("{:x}", hasher.finalize()),
        })
    }
}

impl ReleaseSource for GithubClient {
    fn releases(&self, project: &ProjectRef) -> SyncResult<Vec<Release>> {
        GithubClient::releases(self, project)
    }

    fn download(&self, url: &str, dest: &Path) -> SyncResult<Downloaded> {
        GithubClient::download(self, url, dest)
    }
}
