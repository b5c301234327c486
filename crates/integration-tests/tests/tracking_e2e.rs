//! Modification tracking against the real filesystem and real subprocesses

#![cfg(unix)]

use std::fs;
use std::sync::Arc;

use shelldiff_core::application::{ModificationTracker, TrackedRunService, TrackerConfig};
use shelldiff_core::domain::{
    CommandRequest, ContentState, ModuleArgs, TrackedPaths, TrackingPhase, Transition,
};
use shelldiff_core::port::time_provider::SystemTimeProvider;
use shelldiff_infra_system::{LocalFileProbe, SubprocessExecutor};
use tempfile::TempDir;

fn tracker() -> Arc<ModificationTracker> {
    Arc::new(ModificationTracker::new(
        Arc::new(LocalFileProbe::new()),
        TrackerConfig::default(),
    ))
}

fn service() -> TrackedRunService {
    let time_provider = Arc::new(SystemTimeProvider);
    TrackedRunService::new(
        tracker(),
        Arc::new(SubprocessExecutor::new(
            time_provider.clone(),
            vec!["PATH".to_string(), "HOME".to_string()],
        )),
        time_provider,
    )
}

fn shell_args(script: &str, dir: &TempDir, modifies: &[&str]) -> ModuleArgs {
    ModuleArgs {
        command: CommandRequest::shell(script).with_chdir(dir.path().display().to_string()),
        modifies: Some(TrackedPaths::new(modifies.iter().copied()).unwrap()),
    }
}

#[tokio::test]
async fn test_command_creates_file() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("a.txt");
    let target_str = target.display().to_string();

    let outcome = service()
        .run(shell_args(
            &format!("printf hello > {}", target_str),
            &dir,
            &[&target_str],
        ))
        .await
        .unwrap();

    let tracking = outcome.tracking.unwrap();
    assert!(tracking.changed());
    let record = &tracking.diffs()[0];
    assert_eq!(record.path, target_str);
    assert_eq!(record.transition, Transition::Created);
    assert_eq!(record.before, ContentState::Absent);
    assert_eq!(
        record.after,
        ContentState::Text {
            content: "hello".to_string()
        }
    );
}

#[tokio::test]
async fn test_command_modifies_and_deletes() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("conf"), "a\n").unwrap();
    fs::write(dir.path().join("stale"), "old\n").unwrap();
    fs::write(dir.path().join("keep"), "same\n").unwrap();

    let outcome = service()
        .run(shell_args(
            "echo b > conf && rm stale",
            &dir,
            &["keep", "conf", "stale"],
        ))
        .await
        .unwrap();

    let tracking = outcome.tracking.unwrap();
    assert!(tracking.changed());

    let transitions: Vec<(&str, Transition)> = tracking
        .diffs()
        .iter()
        .map(|d| (d.path.as_str(), d.transition))
        .collect();
    assert_eq!(
        transitions,
        vec![
            ("keep", Transition::Unchanged),
            ("conf", Transition::Modified),
            ("stale", Transition::Deleted),
        ]
    );

    let conf = &tracking.diffs()[1];
    assert!(conf.unified_diff.contains("--- before/conf"));
    assert!(conf.unified_diff.contains("-a\n"));
    assert!(conf.unified_diff.contains("+b\n"));
}

#[tokio::test]
async fn test_untouched_files_are_unchanged() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("one"), "1").unwrap();

    let outcome = service()
        .run(shell_args("true", &dir, &["one", "never-created"]))
        .await
        .unwrap();

    let tracking = outcome.tracking.unwrap();
    assert!(!tracking.changed());
    assert!(tracking
        .diffs()
        .iter()
        .all(|d| d.transition == Transition::Unchanged));
}

#[tokio::test]
async fn test_recreated_identical_file_is_unchanged() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("f"), "content\n").unwrap();

    let outcome = service()
        .run(shell_args("rm f && echo content > f", &dir, &["f"]))
        .await
        .unwrap();

    assert!(!outcome.tracking.unwrap().changed());
}

#[tokio::test]
async fn test_directory_warning_does_not_mask_changes() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("subdir")).unwrap();
    fs::write(dir.path().join("log"), "").unwrap();

    let outcome = service()
        .run(shell_args("echo line >> log", &dir, &["subdir", "log"]))
        .await
        .unwrap();

    let tracking = outcome.tracking.unwrap();
    assert!(tracking.changed());
    assert_eq!(tracking.diffs()[0].transition, Transition::Indeterminate);
    assert_eq!(tracking.diffs()[1].transition, Transition::Modified);
    assert_eq!(tracking.warnings().len(), 2);
    assert_eq!(tracking.warnings()[0].phase, TrackingPhase::Snapshot);
}

#[tokio::test]
async fn test_failing_command_still_tracked() {
    let dir = TempDir::new().unwrap();

    let outcome = service()
        .run(shell_args("echo partial > out; exit 1", &dir, &["out"]))
        .await
        .unwrap();

    let execution = outcome.execution.as_ref().unwrap();
    assert_eq!(execution.exit_code, Some(1));
    assert!(outcome.tracking.unwrap().changed());
}

#[tokio::test]
async fn test_timed_out_command_still_tracked() {
    let dir = TempDir::new().unwrap();
    let mut args = shell_args("echo started > marker; sleep 10", &dir, &["marker"]);
    args.command.timeout_ms = Some(500);

    let outcome = service().run(args).await.unwrap();

    assert!(outcome.execution.is_err());
    let tracking = outcome.tracking.unwrap();
    assert_eq!(tracking.diffs()[0].transition, Transition::Created);
}

#[tokio::test]
async fn test_empty_modifies_tracks_nothing() {
    let dir = TempDir::new().unwrap();

    let outcome = service()
        .run(shell_args("echo x > stray", &dir, &[]))
        .await
        .unwrap();

    assert!(outcome.ran());
    assert!(outcome.tracking.is_none());
    assert!(dir.path().join("stray").exists());
}

#[test]
fn test_snapshot_and_compare_directly() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("data.bin");
    fs::write(&path, [0u8, 255, 1]).unwrap();

    let tracker = tracker();
    let paths = TrackedPaths::new([path.display().to_string()]).unwrap();
    let snapshot = tracker.snapshot(&paths, None);
    assert!(snapshot.files()[0].existed_before());
    assert_eq!(snapshot.files()[0].content(), &[0u8, 255, 1]);

    fs::write(&path, [0u8, 255, 2]).unwrap();
    let result = tracker.compare(snapshot);

    let record = &result.diffs()[0];
    assert_eq!(record.transition, Transition::Modified);
    assert!(matches!(record.after, ContentState::Binary { size: 3, .. }));
    assert!(record.unified_diff.starts_with("Binary files"));
}
