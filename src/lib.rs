pub mod agent;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod git;
pub mod host;
pub mod log;
pub mod remote;
pub mod status;
pub mod util;

pub use agent::{AgentState, BackupAgent, BackupOutcome};
pub use config::{BackupSettings, HostConfig, ValidatedConfig};
pub use error::{ConfigError, Error, Result};
