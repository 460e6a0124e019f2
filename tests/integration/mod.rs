//! Integration tests for the backup agent against the real `git` binary.
//!
//! # Test Categories
//!
//! - `bootstrap`: repository creation, idempotence and remote setup
//! - `save_events`: the save-triggered stage, commit and push sequence
//!
//! Pushes go to a local bare repository through a `url.<base>.insteadOf`
//! rewrite, so no network access is needed.

mod fixtures;

mod bootstrap;
mod save_events;
