//! Read-only inspection of the backup repository.

use git2::{ErrorCode, Repository, Status, StatusOptions};
use serde::Serialize;

use crate::bootstrap::REMOTE_NAME;
use crate::config::ValidatedConfig;
use crate::remote::redact_token;
use crate::Result;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LastCommit {
    pub id: String,
    pub summary: String,
    pub time: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RepoStatus {
    pub repo_path: String,
    pub exists: bool,
    pub branch: Option<String>,
    pub last_commit: Option<LastCommit>,
    /// The backup remote, with credentials hidden.
    pub remote: Option<String>,
    /// Watched files whose working copy differs from the last commit.
    pub pending: Vec<String>,
}

impl RepoStatus {
    pub fn inspect(config: &ValidatedConfig) -> Result<Self> {
        let mut status = RepoStatus {
            repo_path: config.repo_path.display().to_string(),
            exists: false,
            branch: None,
            last_commit: None,
            remote: None,
            pending: Vec::new(),
        };

        let repo = match Repository::open(&config.repo_path) {
            Ok(repo) => repo,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(status),
            Err(e) => return Err(e.into()),
        };
        status.exists = true;

        match repo.head() {
            Ok(head) => {
                status.branch = head.shorthand().map(String::from);
                let commit = head.peel_to_commit()?;
                status.last_commit = Some(LastCommit {
                    id: commit.id().to_string(),
                    summary: commit.summary().unwrap_or_default().to_string(),
                    time: commit.time().seconds(),
                });
            }
            Err(e) if e.code() == ErrorCode::UnbornBranch => {
                // No commits yet; HEAD still names the branch.
                status.branch = repo
                    .find_reference("HEAD")
                    .ok()
                    .and_then(|r| r.symbolic_target().map(String::from))
                    .map(|t| t.trim_start_matches("refs/heads/").to_string());
            }
            Err(e) => return Err(e.into()),
        }

        status.remote = match repo.find_remote(REMOTE_NAME) {
            Ok(remote) => remote.url().map(redact_token),
            Err(e) if e.code() == ErrorCode::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        let mut opts = StatusOptions::new();
        opts.include_untracked(true);
        let statuses = repo.statuses(Some(&mut opts))?;
        for filename in &config.watched_files {
            let changed = statuses.iter().any(|entry| {
                entry.path() == Some(filename.as_str()) && entry.status() != Status::CURRENT
            });
            if changed {
                status.pending.push(filename.clone());
            }
        }

        Ok(status)
    }

    /// Human-readable multi-line summary.
    pub fn render(&self) -> String {
        if !self.exists {
            return format!("No backup repository at {}", self.repo_path);
        }
        let mut lines = vec![format!("Repository: {}", self.repo_path)];
        lines.push(format!(
            "Branch:     {}",
            self.branch.as_deref().unwrap_or("(detached)")
        ));
        lines.push(match &self.last_commit {
            Some(c) => format!("Last:       {:.7} {}", c.id, c.summary),
            None => "Last:       (no commits)".to_string(),
        });
        lines.push(format!(
            "Remote:     {}",
            self.remote.as_deref().unwrap_or("(not configured)")
        ));
        if self.pending.is_empty() {
            lines.push("Pending:    none".to_string());
        } else {
            lines.push(format!("Pending:    {}", self.pending.join(", ")));
        }
        lines.join("\n")
    }
}
