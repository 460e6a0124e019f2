use std::path::PathBuf;

use thiserror::Error;

/// Problems with the `[git_backup]` settings that make initialization impossible.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("remote_url is required when git_backup is enabled")]
    MissingRemote,

    #[error("access_token is required when git_backup is enabled")]
    MissingToken,

    #[error("remote_url must look like scheme://host/path, got '{0}'")]
    InvalidRemote(String),

    #[error("push_timeout_secs must be greater than zero")]
    InvalidPushTimeout,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Version control tool not found: {0}")]
    ToolNotFound(String),

    #[error("Command '{command}' failed (exit code {code:?}): {stderr}")]
    Command {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Saved file does not exist: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("Repository bootstrap failed during {step}: {source}")]
    Bootstrap {
        step: &'static str,
        #[source]
        source: Box<Error>,
    },

    #[error("Backup of '{filename}' failed: {source}")]
    Backup {
        filename: String,
        #[source]
        source: Box<Error>,
    },

    #[error("No home directory")]
    NoHomeDir,

    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Task join error: {0}")]
    TaskJoin(String),

    #[error("Invalid lifecycle event {event} in state {from}")]
    InvalidTransition { from: String, event: String },
}

impl Error {
    /// Wrap an error as a failure of the named bootstrap step.
    pub fn bootstrap(step: &'static str, source: Error) -> Self {
        Error::Bootstrap {
            step,
            source: Box::new(source),
        }
    }

    /// Wrap an error as a failed backup of `filename`.
    pub fn backup(filename: impl Into<String>, source: Error) -> Self {
        Error::Backup {
            filename: filename.into(),
            source: Box::new(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
