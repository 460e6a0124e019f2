use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use gitbackup::config::validate;
use gitbackup::git::SystemGit;
use gitbackup::host::{LocalEventBus, FILE_SAVED_EVENT};
use gitbackup::status::RepoStatus;
use gitbackup::{glog, BackupAgent, HostConfig, Result};

/// gitbackup - commit and push watched configuration files whenever they are saved
#[derive(Parser, Debug)]
#[command(name = "gitbackup")]
#[command(version, about, long_about = None)]
#[command(after_help = "ENVIRONMENT:\n    GITBACKUP_DEBUG=1     Enable debug logging (alternative to --debug)")]
pub struct Cli {
    /// Host configuration file; the backup repository lives in its directory
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging (writes to ~/.gitbackup/gitbackup.log)
    #[arg(short = 'd', long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Read saved file paths from stdin, one per line, and back up each (default)
    Run,

    /// Deliver save events for the given files once
    Save {
        /// Paths of the files that were saved
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Bootstrap the repository and report the agent state
    Init,

    /// Show the backup repository status
    Status {
        /// Output JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    gitbackup::log::init_with_options(cli.debug, true);

    let config_path = match cli.config {
        Some(path) => path,
        None => HostConfig::default_path()?,
    };
    let host = HostConfig::load(&config_path)?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run_events(&host, &config_path),
        Command::Save { paths } => run_save(&host, &config_path, paths),
        Command::Init => run_init(&host, &config_path),
        Command::Status { json } => run_status(&host, &config_path, json),
    }
}

/// Initialize the agent and wire it to a fresh event bus.
fn start_agent(
    rt: &tokio::runtime::Runtime,
    host: &HostConfig,
    config_path: &Path,
) -> (Arc<BackupAgent>, LocalEventBus) {
    let agent = Arc::new(rt.block_on(BackupAgent::initialize(
        &host.git_backup,
        config_path,
        Arc::new(SystemGit::new()),
    )));
    let mut bus = LocalEventBus::new();
    agent.clone().register(&mut bus);
    (agent, bus)
}

fn run_events(host: &HostConfig, config_path: &Path) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    let (agent, bus) = start_agent(&rt, host, config_path);
    glog!("Listening for save events on stdin (agent {})", agent.state());

    for line in io::stdin().lock().lines() {
        let line = line?;
        let path = line.trim();
        if path.is_empty() {
            continue;
        }
        rt.block_on(bus.dispatch(FILE_SAVED_EVENT, PathBuf::from(path)));
    }

    glog!("Event stream closed, exiting");
    Ok(())
}

fn run_save(host: &HostConfig, config_path: &Path, paths: Vec<PathBuf>) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    let (_agent, bus) = start_agent(&rt, host, config_path);
    for path in paths {
        rt.block_on(bus.dispatch(FILE_SAVED_EVENT, path));
    }
    Ok(())
}

fn run_init(host: &HostConfig, config_path: &Path) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    let (agent, _bus) = start_agent(&rt, host, config_path);
    println!("Agent state: {}", agent.state());
    if let Some(config) = agent.config() {
        println!("Repository:  {}", config.repo_path.display());
        println!("Watching:    {}", config.watched_files.join(", "));
    }
    Ok(())
}

fn run_status(host: &HostConfig, config_path: &Path, json: bool) -> Result<()> {
    // Inspection only needs paths and the watch list, not the remote settings.
    let mut settings = host.git_backup.clone();
    settings.enabled = false;
    let config = validate(&settings, config_path)?;
    let status = RepoStatus::inspect(&config)?;

    if json {
        let output = serde_json::json!({
            "enabled": host.git_backup.enabled,
            "status": status,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Enabled:    {}", host.git_backup.enabled);
        println!("{}", status.render());
    }
    Ok(())
}
