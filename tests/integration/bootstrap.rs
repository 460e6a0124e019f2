//! Repository bootstrap against a real working directory.

use gitbackup::bootstrap::{COMMIT_AUTHOR_EMAIL, COMMIT_AUTHOR_NAME, INITIAL_COMMIT_MESSAGE};
use gitbackup::AgentState;

use crate::fixtures::{git, TestHost, TOKEN_URL};

#[tokio::test]
async fn test_bootstrap_creates_repository_with_initial_commit() {
    let host = TestHost::new();

    let agent = host.agent(&host.settings()).await;

    assert_eq!(agent.state(), AgentState::Ready);
    assert!(host.has_repo());
    assert_eq!(host.commit_count(), 1);
    assert_eq!(host.head_message(), INITIAL_COMMIT_MESSAGE);
    assert_eq!(
        git(&host.config_dir, &["rev-parse", "--abbrev-ref", "HEAD"]),
        "main"
    );
    assert_eq!(git(&host.config_dir, &["config", "user.name"]), COMMIT_AUTHOR_NAME);
    assert_eq!(git(&host.config_dir, &["config", "user.email"]), COMMIT_AUTHOR_EMAIL);
    // Only existing watched files are committed; the host config is not.
    assert_eq!(git(&host.config_dir, &["ls-files"]), "printer.cfg");
}

#[tokio::test]
async fn test_remote_carries_token() {
    let host = TestHost::new();

    host.agent(&host.settings()).await;

    assert_eq!(
        git(&host.config_dir, &["remote", "get-url", "origin"]),
        TOKEN_URL
    );
}

#[tokio::test]
async fn test_bootstrap_is_idempotent() {
    let host = TestHost::new();
    let settings = host.settings();

    let first = host.agent(&settings).await;
    let second = host.agent(&settings).await;

    assert_eq!(first.state(), AgentState::Ready);
    assert_eq!(second.state(), AgentState::Ready);
    assert_eq!(host.commit_count(), 1);
    assert_eq!(git(&host.config_dir, &["remote"]), "origin");
    assert_eq!(
        git(&host.config_dir, &["remote", "get-url", "origin"]),
        TOKEN_URL
    );
}

#[tokio::test]
async fn test_restart_picks_up_new_token() {
    let host = TestHost::new();
    host.agent(&host.settings()).await;

    let mut settings = host.settings();
    settings.access_token = "rotated".to_string();
    host.agent(&settings).await;

    assert_eq!(
        git(&host.config_dir, &["remote", "get-url", "origin"]),
        "https://rotated@example.invalid/user/printer-config.git"
    );
    assert_eq!(host.commit_count(), 1);
}

#[tokio::test]
async fn test_no_watched_files_present_still_succeeds() {
    let host = TestHost::new();
    let mut settings = host.settings();
    settings.watched_files = "macros.cfg".to_string();

    let agent = host.agent(&settings).await;

    assert_eq!(agent.state(), AgentState::Ready);
    assert!(host.has_repo());
    assert_eq!(git(&host.config_dir, &["ls-files"]), "");
}

#[tokio::test]
async fn test_disabled_config_leaves_directory_untouched() {
    let host = TestHost::new();
    let mut settings = host.settings();
    settings.enabled = false;

    let agent = host.agent(&settings).await;

    assert_eq!(agent.state(), AgentState::Disabled);
    assert!(!host.has_repo());
}

#[tokio::test]
async fn test_missing_remote_fails_init_without_mutation() {
    let host = TestHost::new();
    let mut settings = host.settings();
    settings.remote_url.clear();

    let agent = host.agent(&settings).await;

    assert_eq!(agent.state(), AgentState::FailedInit);
    assert!(!host.has_repo());
}
