//! Repository configuration loaded from `config.ini`.
//!
//! The configuration names the GitHub projects to aggregate, the bearer
//! token used for API requests, and the public output directory:
//!
//! ```ini
//! [github]
//! token = ghp_xxxxxxxxxxxx
//!
//! [repository]
//! public_dir = public
//!
//! [addons]
//! weather = Foo/bar
//! player = Example/plugin.video.example
//! ```
//!
//! Keys in the `[addons]` section are labels only; the values are
//! `owner/name` project references, processed in file order. The token
//! falls back to the `GITHUB_TOKEN` environment variable when the
//! `[github]` section does not provide one.

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ini::Ini;
use thiserror::Error;

/// Configuration filename.
pub const CONFIG_FILENAME: &str = "config.ini";

/// Default output directory, relative to the working directory.
pub const DEFAULT_PUBLIC_DIR: &str = "public";

/// Environment variable consulted when no token is configured.
pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read or parsed.
    #[error("failed to load {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    /// A project reference is not of the form `owner/name`.
    #[error("invalid project reference '{value}': expected owner/name")]
    InvalidProject { value: String },

    /// The `[addons]` section is missing or empty.
    #[error("no projects configured in the [addons] section")]
    NoProjects,
}

/// An upstream project, identified by its GitHub owner and repository name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectRef {
    /// Repository owner (user or organization).
    pub owner: String,

    /// Repository name; doubles as the addon directory name.
    pub name: String,
}

impl ProjectRef {
    /// Create a new project reference.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl FromStr for ProjectRef {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidProject {
            value: s.to_string(),
        };

        let (owner, name) = s.split_once('/').ok_or_else(invalid)?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(invalid());
        }

        Ok(Self::new(owner, name))
    }
}

impl fmt::Display for ProjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Repository builder configuration.
#[derive(Debug, Clone)]
pub struct RepoConfig {
    /// GitHub bearer token, if any.
    pub token: Option<String>,

    /// Public output directory holding the manifest and addon directories.
    pub public_dir: PathBuf,

    /// Projects to aggregate, in configuration order.
    pub projects: Vec<ProjectRef>,
}

impl RepoConfig {
    /// Load configuration from an INI file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, a project
    /// reference is malformed, or no projects are configured.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Load {
            path: path.to_path_buf(),
            source: e,
        })?;

        let token = ini
            .get_from(Some("github"), "token")
            .map(str::to_string)
            .or_else(|| env::var(TOKEN_ENV_VAR).ok());

        let public_dir = ini
            .get_from(Some("repository"), "public_dir")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PUBLIC_DIR));

        let mut projects = Vec::new();
        if let Some(section) = ini.section(Some("addons")) {
            for (_, value) in section.iter() {
                projects.push(value.parse()?);
            }
        }

        if projects.is_empty() {
            return Err(ConfigError::NoProjects);
        }

        Ok(Self {
            token,
            public_dir,
            projects,
        })
    }

    /// Default configuration path in the user config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("addonsmith").join(CONFIG_FILENAME))
    }
}
