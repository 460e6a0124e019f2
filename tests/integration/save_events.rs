//! Save events driving real commits and pushes.

use std::sync::Arc;

use gitbackup::host::{LocalEventBus, FILE_SAVED_EVENT};
use gitbackup::{AgentState, BackupOutcome, Error};

use crate::fixtures::{git, TestHost};

#[tokio::test]
async fn test_changed_file_is_committed_and_pushed() {
    let host = TestHost::new();
    let agent = host.agent(&host.settings()).await;
    host.route_remote_locally();

    let saved = host.write("printer.cfg", "[printer]\nkinematics: corexy\nmax_velocity: 300\n");
    let outcome = agent.backup(&saved).await.unwrap();

    assert_eq!(
        outcome,
        BackupOutcome::BackedUp {
            filename: "printer.cfg".to_string(),
            message: "Auto-backup: printer.cfg modified".to_string(),
        }
    );
    assert_eq!(host.commit_count(), 2);
    assert_eq!(host.head_message(), "Auto-backup: printer.cfg modified");
    assert_eq!(
        host.remote_head_message("main"),
        "Auto-backup: printer.cfg modified"
    );
}

#[tokio::test]
async fn test_commit_leaves_other_staged_files_alone() {
    let host = TestHost::new();
    let agent = host.agent(&host.settings()).await;
    host.route_remote_locally();

    host.write("macros.cfg", "[gcode_macro PARK]\ngcode: G28\n");
    git(&host.config_dir, &["add", "macros.cfg"]);
    let saved = host.write("printer.cfg", "[printer]\nkinematics: delta\n");
    let outcome = agent.backup(&saved).await.unwrap();

    assert!(matches!(outcome, BackupOutcome::BackedUp { .. }));
    assert_eq!(
        git(&host.config_dir, &["show", "--name-only", "--format=", "HEAD"]),
        "printer.cfg"
    );
    assert_eq!(
        git(&host.config_dir, &["diff", "--cached", "--name-only"]),
        "macros.cfg"
    );
}

#[tokio::test]
async fn test_unchanged_save_makes_no_commit() {
    let host = TestHost::new();
    let agent = host.agent(&host.settings()).await;

    let outcome = agent.backup(&host.file("printer.cfg")).await.unwrap();

    assert_eq!(outcome, BackupOutcome::Unchanged);
    assert_eq!(host.commit_count(), 1);
}

#[tokio::test]
async fn test_new_watched_file_is_backed_up() {
    let host = TestHost::new();
    let agent = host.agent(&host.settings()).await;
    host.route_remote_locally();

    let saved = host.write("macros.cfg", "[gcode_macro PARK]\ngcode: G28\n");
    let outcome = agent.backup(&saved).await.unwrap();

    assert!(matches!(outcome, BackupOutcome::BackedUp { .. }));
    assert_eq!(host.head_message(), "Auto-backup: macros.cfg modified");
}

#[tokio::test]
async fn test_unwatched_file_is_not_staged() {
    let host = TestHost::new();
    let agent = host.agent(&host.settings()).await;

    let saved = host.write("notes.txt", "not watched\n");
    let outcome = agent.backup(&saved).await.unwrap();

    assert_eq!(outcome, BackupOutcome::Ignored);
    assert_eq!(host.commit_count(), 1);
    assert_eq!(git(&host.config_dir, &["ls-files"]), "printer.cfg");
}

#[tokio::test]
async fn test_push_failure_keeps_local_commit() {
    let host = TestHost::new();
    // No local routing: the push to example.invalid fails.
    let agent = host.agent(&host.settings()).await;

    let saved = host.write("printer.cfg", "[printer]\nkinematics: cartesian\n");
    let err = agent.backup(&saved).await.unwrap_err();

    assert!(matches!(err, Error::Backup { .. }));
    assert_eq!(host.commit_count(), 2);
    assert_eq!(host.head_message(), "Auto-backup: printer.cfg modified");
    assert_eq!(agent.state(), AgentState::Ready);

    // The next event is processed independently once the remote is reachable.
    host.route_remote_locally();
    let saved = host.write("printer.cfg", "[printer]\nkinematics: corexy\n");
    assert!(matches!(
        agent.backup(&saved).await.unwrap(),
        BackupOutcome::BackedUp { .. }
    ));
    assert_eq!(host.commit_count(), 3);
}

#[tokio::test]
async fn test_event_bus_delivers_saves() {
    let host = TestHost::new();
    let agent = Arc::new(host.agent(&host.settings()).await);
    host.route_remote_locally();
    let mut bus = LocalEventBus::new();
    assert!(agent.clone().register(&mut bus));

    let saved = host.write("printer.cfg", "[printer]\nkinematics: delta\n");
    bus.dispatch(FILE_SAVED_EVENT, saved.clone()).await;
    // A second delivery of the same content is a no-op.
    bus.dispatch(FILE_SAVED_EVENT, saved).await;

    assert_eq!(host.commit_count(), 2);
    assert_eq!(host.remote_head_message("main"), "Auto-backup: printer.cfg modified");
}
