//! Idempotent repository bootstrap: tool check, init, remote setup.
//!
//! Safe to run on every process start. An existing repository is left alone;
//! the remote is always recreated so a changed URL or token takes effect.

use crate::config::ValidatedConfig;
use crate::git::{GitRepo, GIT_BINARY};
use crate::remote::redact_token;
use crate::{glog, glog_debug, Error, Result};

/// Name of the remote that receives backups.
pub const REMOTE_NAME: &str = "origin";

/// Identity used for autonomous commits.
pub const COMMIT_AUTHOR_NAME: &str = "Config Backup Agent";
pub const COMMIT_AUTHOR_EMAIL: &str = "backup@gitbackup.local";

pub const INITIAL_COMMIT_MESSAGE: &str = "Initial commit: watched configuration files";

/// Run every bootstrap step in order; the first failure aborts the sequence.
pub fn ensure_repository(repo: &GitRepo, config: &ValidatedConfig) -> Result<()> {
    check_tool(repo).map_err(|e| Error::bootstrap("tool check", e))?;
    init_repository(repo, config).map_err(|e| Error::bootstrap("repository init", e))?;
    setup_remote(repo, config).map_err(|e| Error::bootstrap("remote setup", e))?;
    Ok(())
}

fn check_tool(repo: &GitRepo) -> Result<()> {
    if !repo.is_available() {
        return Err(Error::ToolNotFound(GIT_BINARY.to_string()));
    }
    let version = repo.version().map_err(|e| match e {
        Error::ToolNotFound(_) => e,
        other => Error::ToolNotFound(format!("{} ({})", GIT_BINARY, other)),
    })?;
    glog_debug!("Using {}", version);
    Ok(())
}

/// Returns whether a new repository was created.
fn init_repository(repo: &GitRepo, config: &ValidatedConfig) -> Result<bool> {
    if repo.exists() {
        glog!("Git repository already exists at {}", repo.path().display());
        return Ok(false);
    }

    glog!("Initializing git repository at {}", repo.path().display());
    repo.init()?;
    repo.checkout_new_branch(&config.branch)?;
    repo.set_identity(COMMIT_AUTHOR_NAME, COMMIT_AUTHOR_EMAIL)?;

    let mut staged = 0;
    for filename in &config.watched_files {
        let path = repo.path().join(filename);
        if path.is_file() {
            repo.add(&path)?;
            staged += 1;
        } else {
            glog_debug!("Watched file '{}' does not exist yet, not staged", filename);
        }
    }

    if staged > 0 {
        repo.commit(INITIAL_COMMIT_MESSAGE)?;
        glog!("Initial commit created with {} watched file(s)", staged);
    } else {
        glog!("No watched files present; repository initialized without a commit");
    }
    Ok(true)
}

fn setup_remote(repo: &GitRepo, config: &ValidatedConfig) -> Result<()> {
    let url = config.push_url()?;
    if repo.remove_remote(REMOTE_NAME)? {
        glog_debug!("Removed previous '{}' remote", REMOTE_NAME);
    }
    repo.add_remote(REMOTE_NAME, &url)?;
    glog!(
        "Remote '{}' configured for {}",
        REMOTE_NAME,
        redact_token(&url)
    );
    Ok(())
}
