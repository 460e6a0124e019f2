use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::remote;
use crate::{glog_debug, Error, Result};

pub const DEFAULT_WATCHED_FILES: &str = "printer.cfg";
pub const DEFAULT_COMMIT_MESSAGE: &str = "Auto-backup: {filename} modified";
pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_PUSH_TIMEOUT_SECS: u64 = 60;

/// Placeholder replaced by the saved file's base name in commit messages.
pub const FILENAME_PLACEHOLDER: &str = "{filename}";

/// The `[git_backup]` table of the host configuration, as written by the user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BackupSettings {
    pub enabled: bool,
    pub remote_url: String,
    #[serde(alias = "github_token")]
    pub access_token: String,
    /// Comma-separated file names.
    pub watched_files: String,
    pub commit_message: String,
    pub branch: String,
    pub push_timeout_secs: u64,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            remote_url: String::new(),
            access_token: String::new(),
            watched_files: DEFAULT_WATCHED_FILES.to_string(),
            commit_message: DEFAULT_COMMIT_MESSAGE.to_string(),
            branch: DEFAULT_BRANCH.to_string(),
            push_timeout_secs: DEFAULT_PUSH_TIMEOUT_SECS,
        }
    }
}

/// The host's main configuration file. Only the `[git_backup]` table is read;
/// every other table belongs to the host and is ignored.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct HostConfig {
    #[serde(default)]
    pub git_backup: BackupSettings,
}

impl HostConfig {
    /// Default location of the host configuration file.
    pub fn default_path() -> Result<PathBuf> {
        Ok(dirs::home_dir()
            .ok_or(Error::NoHomeDir)?
            .join("printer_data")
            .join("config")
            .join("moonraker.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        glog_debug!("HostConfig::load path={}", path.display());
        let config: Self = toml::from_str(&fs::read_to_string(path)?)?;
        glog_debug!(
            "Host config loaded: enabled={}, watched_files={:?}, branch={}",
            config.git_backup.enabled,
            config.git_backup.watched_files,
            config.git_backup.branch
        );
        Ok(config)
    }
}

/// Settings after validation. Immutable for the lifetime of the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedConfig {
    pub enabled: bool,
    pub repo_path: PathBuf,
    pub remote_url: String,
    pub access_token: String,
    pub watched_files: Vec<String>,
    pub commit_message: String,
    pub branch: String,
    pub push_timeout: Duration,
}

impl ValidatedConfig {
    pub fn is_watched(&self, filename: &str) -> bool {
        self.watched_files.iter().any(|f| f == filename)
    }

    pub fn render_message(&self, filename: &str) -> String {
        self.commit_message.replace(FILENAME_PLACEHOLDER, filename)
    }

    /// Token-bearing URL for the backup remote.
    pub fn push_url(&self) -> std::result::Result<String, ConfigError> {
        remote::inject_token(&self.remote_url, &self.access_token)
    }
}

/// Validate `settings` and resolve the repository location from the path of
/// the host's main configuration file.
///
/// A disabled configuration is never rejected; the remote checks only apply
/// when `enabled` is set.
pub fn validate(
    settings: &BackupSettings,
    main_config_path: &Path,
) -> std::result::Result<ValidatedConfig, ConfigError> {
    let remote_url = settings.remote_url.trim().to_string();
    let access_token = settings.access_token.trim().to_string();

    if settings.enabled {
        if remote_url.is_empty() {
            return Err(ConfigError::MissingRemote);
        }
        if access_token.is_empty() {
            return Err(ConfigError::MissingToken);
        }
        remote::check_remote(&remote_url)?;
        if settings.push_timeout_secs == 0 {
            return Err(ConfigError::InvalidPushTimeout);
        }
    }

    let branch = match settings.branch.trim() {
        "" => DEFAULT_BRANCH.to_string(),
        b => b.to_string(),
    };

    Ok(ValidatedConfig {
        enabled: settings.enabled,
        repo_path: resolve_repo_path(main_config_path),
        remote_url,
        access_token,
        watched_files: parse_watched_files(&settings.watched_files),
        commit_message: settings.commit_message.clone(),
        branch,
        push_timeout: Duration::from_secs(settings.push_timeout_secs),
    })
}

/// Split a comma-separated list, trimming entries and dropping empty and
/// repeated ones while keeping the original order.
pub fn parse_watched_files(raw: &str) -> Vec<String> {
    let mut files: Vec<String> = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        if !files.iter().any(|f| f == entry) {
            files.push(entry.to_string());
        }
    }
    files
}

/// Directory containing the main config file, expanded and made absolute.
fn resolve_repo_path(main_config_path: &Path) -> PathBuf {
    let expanded = expand_tilde(main_config_path);
    let absolute = if expanded.is_absolute() {
        expanded
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(expanded),
            Err(_) => expanded,
        }
    };
    let normalized = normalize(&absolute);
    match normalized.parent() {
        Some(parent) => parent.to_path_buf(),
        None => normalized,
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    path.to_path_buf()
}

/// Lexically resolve `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
