//! The backup agent: lifecycle state and the save-event handler.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::OwnedMutexGuard;

use crate::bootstrap::{ensure_repository, REMOTE_NAME};
use crate::config::{validate, BackupSettings, ValidatedConfig};
use crate::git::{GitRepo, GitRunner};
use crate::host::{EventBus, FILE_SAVED_EVENT};
use crate::util::{blocking, blocking_with_timeout, repo_lock};
use crate::{glog, glog_debug, glog_error, Error, Result};

/// Lifecycle of an agent. Set during [`BackupAgent::initialize`] and fixed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    Disabled,
    Initializing,
    Ready,
    FailedInit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Start,
    Succeeded,
    Failed,
}

impl AgentState {
    /// Apply `event`, rejecting anything outside
    /// Disabled -> Initializing -> Ready | FailedInit.
    pub fn transition(self, event: LifecycleEvent) -> Result<Self> {
        match (self, event) {
            (AgentState::Disabled, LifecycleEvent::Start) => Ok(AgentState::Initializing),
            (AgentState::Initializing, LifecycleEvent::Succeeded) => Ok(AgentState::Ready),
            (AgentState::Initializing, LifecycleEvent::Failed) => Ok(AgentState::FailedInit),
            (from, event) => Err(Error::InvalidTransition {
                from: from.to_string(),
                event: format!("{:?}", event),
            }),
        }
    }

    /// Only a ready agent reacts to save events; every other state is inert.
    pub fn accepts_events(self) -> bool {
        self == AgentState::Ready
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AgentState::Disabled => "disabled",
            AgentState::Initializing => "initializing",
            AgentState::Ready => "ready",
            AgentState::FailedInit => "failed-init",
        };
        f.write_str(name)
    }
}

/// What a single save event led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupOutcome {
    /// The agent is not ready.
    Inactive,
    /// The file is not in the watch set.
    Ignored,
    /// Staged content matched the last commit.
    Unchanged,
    /// Committed and pushed.
    BackedUp { filename: String, message: String },
}

/// Everything a ready agent needs to process events.
struct Active {
    config: ValidatedConfig,
    repo: GitRepo,
    lock: Arc<tokio::sync::Mutex<()>>,
}

pub struct BackupAgent {
    state: AgentState,
    active: Option<Active>,
}

impl BackupAgent {
    /// Validate `settings`, bootstrap the repository next to `main_config_path`
    /// and return the agent. Never fails: problems are logged and leave the
    /// agent inert.
    pub async fn initialize(
        settings: &BackupSettings,
        main_config_path: &Path,
        runner: Arc<dyn GitRunner>,
    ) -> Self {
        let state = AgentState::Disabled;
        if !settings.enabled {
            glog!("Git backup is disabled in the configuration");
            return Self {
                state,
                active: None,
            };
        }

        let state = advance(state, LifecycleEvent::Start);
        match start(settings, main_config_path, runner).await {
            Ok(active) => Self {
                state: advance(state, LifecycleEvent::Succeeded),
                active: Some(active),
            },
            Err(e) => {
                glog_error!("Fatal error initializing git backup: {}", e);
                Self {
                    state: advance(state, LifecycleEvent::Failed),
                    active: None,
                }
            }
        }
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    /// The validated configuration, present only for a ready agent.
    pub fn config(&self) -> Option<&ValidatedConfig> {
        self.active.as_ref().map(|a| &a.config)
    }

    /// Subscribe to save events. Returns false, without registering, unless ready.
    pub fn register<B: EventBus + ?Sized>(self: Arc<Self>, bus: &mut B) -> bool {
        if !self.state.accepts_events() {
            glog_debug!("Agent is {}, not registering for save events", self.state);
            return false;
        }
        bus.register(
            FILE_SAVED_EVENT,
            Arc::new(move |path: PathBuf| {
                let agent = self.clone();
                async move { agent.on_file_saved(&path).await }.boxed()
            }),
        );
        true
    }

    /// Host-facing handler. Errors end here: they are logged, never raised.
    pub async fn on_file_saved(&self, path: &Path) {
        match self.backup(path).await {
            Ok(BackupOutcome::BackedUp { filename, .. }) => {
                glog!("Backup of '{}' completed", filename);
            }
            Ok(_) => {}
            Err(e) => glog_error!("{}", e),
        }
    }

    /// Run the stage, check, commit and push sequence for one saved file.
    pub async fn backup(&self, path: &Path) -> Result<BackupOutcome> {
        let Some(active) = self.active.as_ref().filter(|_| self.state.accepts_events()) else {
            return Ok(BackupOutcome::Inactive);
        };
        let Some(filename) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
            return Ok(BackupOutcome::Ignored);
        };
        if !active.config.is_watched(&filename) {
            glog_debug!("Ignoring save of unwatched file {}", path.display());
            return Ok(BackupOutcome::Ignored);
        }

        glog!("Watched file '{}' was saved, starting backup", filename);
        let guard = active.lock.clone().lock_owned().await;
        let result = active.run_backup(path, &filename, guard).await;
        result.map_err(|e| Error::backup(filename, e))
    }
}

impl Active {
    /// `guard` is the repository lock. It moves into the push task, so a push
    /// that outlives its timeout still blocks the next sequence until git exits.
    async fn run_backup(
        &self,
        path: &Path,
        filename: &str,
        guard: OwnedMutexGuard<()>,
    ) -> Result<BackupOutcome> {
        let repo = self.repo.clone();
        let saved = self.repo.path().join(path);
        let staged = saved.clone();
        let status = blocking(move || {
            // A vanished file would stage nothing and look unchanged.
            if !saved.is_file() {
                return Err(Error::MissingFile(saved));
            }
            repo.add(&saved)?;
            repo.tracked_status(&saved)
        })
        .await?;

        if status.is_empty() {
            glog!("No real change detected in '{}', backup skipped", filename);
            return Ok(BackupOutcome::Unchanged);
        }

        let message = self.config.render_message(filename);
        let repo = self.repo.clone();
        let commit_message = message.clone();
        blocking(move || repo.commit_path(&commit_message, &staged)).await?;

        let repo = self.repo.clone();
        let branch = self.config.branch.clone();
        let limit = self.config.push_timeout;
        blocking_with_timeout(limit, move || {
            let _guard = guard;
            repo.push(REMOTE_NAME, &branch, limit)
        })
        .await?;

        Ok(BackupOutcome::BackedUp {
            filename: filename.to_string(),
            message,
        })
    }
}

fn advance(state: AgentState, event: LifecycleEvent) -> AgentState {
    state.transition(event).unwrap_or_else(|e| {
        glog_error!("{}", e);
        AgentState::FailedInit
    })
}

async fn start(
    settings: &BackupSettings,
    main_config_path: &Path,
    runner: Arc<dyn GitRunner>,
) -> Result<Active> {
    let config = validate(settings, main_config_path)?;
    glog!(
        "Git backup starting in {}. Watching: {}",
        config.repo_path.display(),
        config.watched_files.join(", ")
    );

    let repo = GitRepo::new(runner, &config.repo_path);
    let lock = repo_lock(&config.repo_path);
    {
        let _guard = lock.lock().await;
        let (r, c) = (repo.clone(), config.clone());
        blocking(move || ensure_repository(&r, &c)).await?;
    }
    glog!("Git backup ready on branch '{}'", config.branch);

    Ok(Active { config, repo, lock })
}
