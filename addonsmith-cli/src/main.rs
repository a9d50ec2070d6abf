//! Addonsmith CLI - build an addon repository from upstream releases.
//!
//! Reads the project list from `config.ini`, fetches each project's
//! latest GitHub release, and maintains the public repository directory
//! (archives, checksums, extracted metadata, and the merged manifest).

mod error;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use addonsmith::config::CONFIG_FILENAME;
use addonsmith::{ErrorPolicy, GithubClient, RepoConfig, SyncDriver, SyncSummary};

use crate::error::CliError;

/// Build a static addon repository from upstream GitHub releases.
#[derive(Debug, Parser)]
#[command(name = "addonsmith", version, about)]
struct Cli {
    /// Path to the configuration file.
    ///
    /// Defaults to config.ini in the user config directory, falling back
    /// to the working directory.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output directory for the repository (overrides the config file).
    #[arg(long, value_name = "DIR")]
    public_dir: Option<PathBuf>,

    /// GitHub bearer token (overrides the config file and GITHUB_TOKEN).
    #[arg(long, value_name = "TOKEN")]
    token: Option<String>,

    /// Continue with the remaining projects when one fails.
    #[arg(long)]
    keep_going: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("addonsmith=info")),
        )
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(summary) if summary.failed() > 0 => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<SyncSummary, CliError> {
    let config_path = resolve_config_path(cli.config)?;
    let mut config = RepoConfig::load(&config_path)?;

    if let Some(public_dir) = cli.public_dir {
        config.public_dir = public_dir;
    }
    if let Some(token) = cli.token {
        config.token = Some(token);
    }

    let policy = if cli.keep_going {
        ErrorPolicy::Continue
    } else {
        ErrorPolicy::FailFast
    };

    println!("Addonsmith v{}", addonsmith::VERSION);
    println!();
    println!("Config:   {}", config_path.display());
    println!("Output:   {}", config.public_dir.display());
    println!("Projects: {}", config.projects.len());
    println!();

    let client = GithubClient::new(config.token.as_deref())?;
    let driver = SyncDriver::new(client, &config.public_dir).with_policy(policy);
    let summary = driver.run(&config.projects)?;

    print_summary(&summary);
    Ok(summary)
}

/// Pick the configuration file: explicit flag, then the user config
/// directory, then the working directory.
fn resolve_config_path(flag: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = flag {
        return Ok(path);
    }

    if let Some(default) = RepoConfig::default_path() {
        if default.exists() {
            return Ok(default);
        }
    }

    let local = PathBuf::from(CONFIG_FILENAME);
    if local.exists() {
        return Ok(local);
    }

    Err(CliError::Config(format!(
        "no {} found; create one or pass --config",
        CONFIG_FILENAME
    )))
}

fn print_summary(summary: &SyncSummary) {
    for (project, outcome) in &summary.outcomes {
        println!("  {:<40} {}", project.to_string(), outcome);
    }
    println!();
    println!(
        "{} fetched, {} up to date, {} failed",
        summary.fetched(),
        summary.skipped(),
        summary.failed()
    );
    println!(
        "Manifest: {} (md5 {})",
        summary.manifest_path.display(),
        summary.manifest_checksum
    );
}
