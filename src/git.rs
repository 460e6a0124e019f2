//! The version-control process boundary.
//!
//! Every git invocation goes through a [`GitRunner`] with an explicit argument
//! vector; nothing is ever passed through a shell.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::Arc;
use std::time::Duration;

use crate::remote::redact_token;
use crate::{glog_debug, glog_trace, glog_warn, Error, Result};

pub const GIT_BINARY: &str = "git";

/// Captured result of one subprocess run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }
}

/// Runs the version-control tool. Implemented by [`SystemGit`] and by test doubles.
pub trait GitRunner: Send + Sync {
    /// Run the tool with `args` in `cwd`. A non-zero exit is not an error here.
    fn run(&self, cwd: &Path, args: &[String]) -> Result<CommandOutput>;

    /// Like [`GitRunner::run`], but the subprocess is stopped once `limit` elapses
    /// and [`Error::Timeout`] is returned. The default ignores the limit.
    fn run_bounded(&self, cwd: &Path, args: &[String], limit: Duration) -> Result<CommandOutput> {
        let _ = limit;
        self.run(cwd, args)
    }

    /// Whether the tool binary can be found at all.
    fn is_available(&self) -> bool;
}

/// The real `git` binary on `PATH`.
#[derive(Debug, Clone)]
pub struct SystemGit {
    binary: String,
}

impl SystemGit {
    pub fn new() -> Self {
        Self::with_binary(GIT_BINARY)
    }

    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn spawn_error(&self, e: std::io::Error) -> Error {
        match e.kind() {
            std::io::ErrorKind::NotFound => Error::ToolNotFound(self.binary.clone()),
            _ => Error::Io(e),
        }
    }
}

impl Default for SystemGit {
    fn default() -> Self {
        Self::new()
    }
}

impl GitRunner for SystemGit {
    fn run(&self, cwd: &Path, args: &[String]) -> Result<CommandOutput> {
        let output = Command::new(&self.binary)
            .args(args)
            .current_dir(cwd)
            // Never wait on an interactive credential prompt.
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .map_err(|e| self.spawn_error(e))?;
        Ok(output.into())
    }

    /// Runs through `tokio::process` on the current runtime so the child is
    /// killed when the deadline drops it. Without a runtime the limit is ignored.
    fn run_bounded(&self, cwd: &Path, args: &[String], limit: Duration) -> Result<CommandOutput> {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return self.run(cwd, args);
        };
        let mut command = tokio::process::Command::new(&self.binary);
        command
            .args(args)
            .current_dir(cwd)
            .env("GIT_TERMINAL_PROMPT", "0")
            .kill_on_drop(true);

        let output = handle
            .block_on(async { tokio::time::timeout(limit, command.output()).await })
            .map_err(|_| Error::Timeout(limit))?
            .map_err(|e| self.spawn_error(e))?;
        Ok(output.into())
    }

    fn is_available(&self) -> bool {
        which::which(&self.binary).is_ok()
    }
}

/// Render an argument list for logs and errors, with credentials hidden.
pub fn describe(args: &[String]) -> String {
    std::iter::once(GIT_BINARY.to_string())
        .chain(args.iter().map(|a| redact_token(a)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// A runner bound to one repository directory.
#[derive(Clone)]
pub struct GitRepo {
    runner: Arc<dyn GitRunner>,
    path: PathBuf,
}

impl GitRepo {
    pub fn new(runner: Arc<dyn GitRunner>, path: &Path) -> Self {
        Self {
            runner,
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_available(&self) -> bool {
        self.runner.is_available()
    }

    /// Whether a repository already exists here (its metadata directory is present).
    pub fn exists(&self) -> bool {
        self.path.join(".git").is_dir()
    }

    fn exec(&self, args: &[String], limit: Option<Duration>) -> Result<CommandOutput> {
        glog_debug!("{} (cwd={})", describe(args), self.path.display());
        let output = match limit {
            Some(limit) => self.runner.run_bounded(&self.path, args, limit)?,
            None => self.runner.run(&self.path, args)?,
        };
        glog_trace!(
            "exit={:?} stdout={:?} stderr={:?}",
            output.code,
            output.stdout,
            output.stderr
        );
        Ok(output)
    }

    fn exec_checked(&self, args: Vec<String>, limit: Option<Duration>) -> Result<String> {
        let output = self.exec(&args, limit)?;
        if !output.success {
            return Err(Error::Command {
                command: describe(&args),
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output.stdout.trim().to_string())
    }

    /// Run without judging the exit status.
    pub fn run_unchecked<I, S>(&self, args: I) -> Result<CommandOutput>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        self.exec(&args, None)
    }

    /// Run and return trimmed stdout; a non-zero exit becomes [`Error::Command`].
    pub fn run<I, S>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exec_checked(args.into_iter().map(Into::into).collect(), None)
    }

    pub fn version(&self) -> Result<String> {
        self.run(["--version"])
    }

    pub fn init(&self) -> Result<()> {
        self.run(["init"]).map(drop)
    }

    pub fn checkout_new_branch(&self, branch: &str) -> Result<()> {
        self.run(["checkout", "-b", branch]).map(drop)
    }

    pub fn set_identity(&self, name: &str, email: &str) -> Result<()> {
        self.run(["config", "user.name", name])?;
        self.run(["config", "user.email", email]).map(drop)
    }

    pub fn add(&self, path: &Path) -> Result<()> {
        let path = path.to_string_lossy().to_string();
        self.run(["add".to_string(), "--".to_string(), path]).map(drop)
    }

    /// Porcelain status of tracked changes to `path` only.
    pub fn tracked_status(&self, path: &Path) -> Result<String> {
        let path = path.to_string_lossy().to_string();
        self.run([
            "status".to_string(),
            "--porcelain".to_string(),
            "--untracked-files=no".to_string(),
            "--".to_string(),
            path,
        ])
    }

    /// Commit everything staged.
    pub fn commit(&self, message: &str) -> Result<()> {
        self.run(["commit", "-m", message]).map(drop)
    }

    /// Commit `path` alone; anything else in the index stays staged.
    pub fn commit_path(&self, message: &str, path: &Path) -> Result<()> {
        let path = path.to_string_lossy().to_string();
        self.run([
            "commit".to_string(),
            "-m".to_string(),
            message.to_string(),
            "--".to_string(),
            path,
        ])
        .map(drop)
    }

    /// Remove a remote. Returns whether one was removed; a missing remote is expected.
    pub fn remove_remote(&self, name: &str) -> Result<bool> {
        let output = self.run_unchecked(["remote", "remove", name])?;
        if !output.success {
            glog_debug!("No remote '{}' to remove: {}", name, output.stderr.trim());
        }
        Ok(output.success)
    }

    pub fn add_remote(&self, name: &str, url: &str) -> Result<()> {
        self.run(["remote", "add", name, url]).map(drop)
    }

    /// Push `branch`, stopping the push once `limit` elapses.
    pub fn push(&self, remote: &str, branch: &str, limit: Duration) -> Result<()> {
        let args = vec!["push".to_string(), remote.to_string(), branch.to_string()];
        let result = self.exec_checked(args, Some(limit)).map(drop);
        if let Err(ref e) = result {
            glog_warn!("Push of '{}' to '{}' failed: {}", branch, remote, e);
        }
        result
    }
}
