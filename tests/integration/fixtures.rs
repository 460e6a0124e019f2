//! Test fixtures for integration tests.
//!
//! Provides helpers for:
//! - A temporary host configuration directory with watched files
//! - A local bare repository standing in for the remote
//! - Reading back repository state with plain git commands

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use tempfile::TempDir;

use gitbackup::git::SystemGit;
use gitbackup::{BackupAgent, BackupSettings};

pub const TOKEN: &str = "abc123";
pub const REMOTE_URL: &str = "https://example.invalid/user/printer-config.git";
pub const TOKEN_URL: &str = "https://abc123@example.invalid/user/printer-config.git";

/// Run git in `dir` and return trimmed stdout, panicking on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// A host configuration directory, as the host would lay it out.
pub struct TestHost {
    pub temp_dir: TempDir,
    /// Directory holding the host config and the watched files.
    pub config_dir: PathBuf,
    /// Bare repository receiving pushes.
    pub remote_dir: PathBuf,
}

impl TestHost {
    /// Create a host directory containing `printer.cfg`.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config_dir = temp_dir.path().join("config");
        let remote_dir = temp_dir.path().join("remote.git");
        std::fs::create_dir_all(&config_dir).expect("Failed to create config dir");
        std::fs::write(config_dir.join("moonraker.toml"), "[server]\nport = 7125\n")
            .expect("Failed to write host config");
        std::fs::write(config_dir.join("printer.cfg"), "[printer]\nkinematics: corexy\n")
            .expect("Failed to write printer.cfg");

        Command::new("git")
            .args(["init", "--bare", "remote.git"])
            .current_dir(temp_dir.path())
            .output()
            .expect("Failed to init bare remote");

        Self {
            temp_dir,
            config_dir,
            remote_dir,
        }
    }

    pub fn main_config(&self) -> PathBuf {
        self.config_dir.join("moonraker.toml")
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.config_dir.join(name)
    }

    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.file(name);
        std::fs::write(&path, content).expect("Failed to write watched file");
        path
    }

    pub fn settings(&self) -> BackupSettings {
        BackupSettings {
            enabled: true,
            remote_url: REMOTE_URL.to_string(),
            access_token: TOKEN.to_string(),
            watched_files: "printer.cfg, macros.cfg".to_string(),
            commit_message: "Auto-backup: {filename} modified".to_string(),
            push_timeout_secs: 30,
            ..BackupSettings::default()
        }
    }

    pub async fn agent(&self, settings: &BackupSettings) -> BackupAgent {
        BackupAgent::initialize(settings, &self.main_config(), Arc::new(SystemGit::new())).await
    }

    /// Send pushes for the token-bearing URL to the local bare repository.
    pub fn route_remote_locally(&self) {
        let key = format!("url.{}.insteadOf", self.remote_dir.display());
        git(&self.config_dir, &["config", &key, TOKEN_URL]);
    }

    pub fn has_repo(&self) -> bool {
        self.config_dir.join(".git").is_dir()
    }

    pub fn commit_count(&self) -> usize {
        git(&self.config_dir, &["rev-list", "--count", "HEAD"])
            .parse()
            .expect("rev-list output is a number")
    }

    pub fn head_message(&self) -> String {
        git(&self.config_dir, &["log", "-1", "--format=%s"])
    }

    pub fn remote_head_message(&self, branch: &str) -> String {
        git(&self.remote_dir, &["log", "-1", "--format=%s", branch])
    }
}
