// Modification Tracker
// Snapshots tracked files before an action and compares them afterward

use super::constants::{DEFAULT_DIFF_CONTEXT_LINES, DEFAULT_MAX_DIFF_BYTES};
use super::diff::{binary_diff, unified_diff};
use crate::domain::{
    ContentState, DiffRecord, FileMetadata, FileObservation, Snapshot, SnapshotState, TrackedFile,
    TrackedPaths, TrackingPhase, TrackingResult, TrackingWarning, Transition,
};
use crate::port::FileProbe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Diff rendering limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerConfig {
    pub diff_context_lines: usize,
    pub max_diff_bytes: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            diff_context_lines: DEFAULT_DIFF_CONTEXT_LINES,
            max_diff_bytes: DEFAULT_MAX_DIFF_BYTES,
        }
    }
}

/// Modification tracker
///
/// Change detection is content-only: a file deleted and recreated with
/// identical bytes between snapshot and compare is `Unchanged`.
pub struct ModificationTracker {
    probe: Arc<dyn FileProbe>,
    config: TrackerConfig,
}

impl ModificationTracker {
    pub fn new(probe: Arc<dyn FileProbe>, config: TrackerConfig) -> Self {
        Self { probe, config }
    }

    pub fn config(&self) -> TrackerConfig {
        self.config
    }

    /// Capture the pre-action state of every tracked path
    ///
    /// # Arguments
    /// * `paths` - Validated tracked paths, in output order
    /// * `base_dir` - Directory relative paths are resolved against
    ///   (the action's working directory); `None` uses the process cwd
    ///
    /// Unreadable paths are recorded as `SnapshotState::Unreadable` and
    /// reported as warnings; the snapshot itself never fails.
    pub fn snapshot(&self, paths: &TrackedPaths, base_dir: Option<&Path>) -> Snapshot {
        info!(tracked_files = paths.len(), "Taking pre-action snapshot");

        let mut warnings = Vec::new();
        let files = paths
            .as_slice()
            .iter()
            .map(|path| {
                let resolved = resolve_path(path, base_dir);
                let state = self.observe(path, &resolved, TrackingPhase::Snapshot, &mut warnings);
                TrackedFile::new(path.clone(), resolved, state)
            })
            .collect();

        Snapshot::new(files, warnings)
    }

    /// Re-read every tracked path and compare against the snapshot
    ///
    /// Produces exactly one DiffRecord per tracked path, in snapshot order.
    pub fn compare(&self, snapshot: Snapshot) -> TrackingResult {
        let (files, mut warnings) = snapshot.into_parts();

        let diffs: Vec<DiffRecord> = files
            .iter()
            .map(|file| {
                let after = self.observe(
                    file.path(),
                    file.resolved(),
                    TrackingPhase::Compare,
                    &mut warnings,
                );
                self.build_record(file, &after)
            })
            .collect();

        let result = TrackingResult::new(diffs, warnings);

        info!(
            tracked_files = result.diffs().len(),
            changed_files = result.changed_records().count(),
            warnings = result.warnings().len(),
            changed = result.changed(),
            "Compared tracked files"
        );

        result
    }

    fn observe(
        &self,
        path: &str,
        resolved: &Path,
        phase: TrackingPhase,
        warnings: &mut Vec<TrackingWarning>,
    ) -> SnapshotState {
        match self.probe.observe(resolved) {
            Ok(FileObservation::Absent) => {
                debug!(path = %path, phase = %phase, "Tracked file absent");
                SnapshotState::Absent
            }
            Ok(FileObservation::Present { content, metadata }) => {
                debug!(path = %path, phase = %phase, bytes = content.len(), "Tracked file read");
                SnapshotState::Present { content, metadata }
            }
            Err(error) => {
                warn!(path = %path, phase = %phase, error = %error, "Tracked file unreadable");
                warnings.push(TrackingWarning {
                    path: path.to_string(),
                    phase,
                    error: error.clone(),
                });
                SnapshotState::Unreadable(error)
            }
        }
    }

    fn build_record(&self, file: &TrackedFile, after: &SnapshotState) -> DiffRecord {
        let before = file.state();
        let transition = classify(before, after);

        let before_content = self.content_state(before);
        let after_content = self.content_state(after);

        let unified = match (transition, &before_content, &after_content) {
            (Transition::Modified, ContentState::Text { content: a }, ContentState::Text { content: b }) => {
                unified_diff(file.path(), a, b, self.config.diff_context_lines)
            }
            (Transition::Modified, _, _) => binary_diff(file.path()),
            _ => String::new(),
        };

        let before_metadata = metadata_of(before);
        let after_metadata = metadata_of(after);
        let metadata_changed = match (&before_metadata, &after_metadata) {
            (Some(a), Some(b)) => !same_attributes(a, b),
            _ => false,
        };

        DiffRecord {
            path: file.path().to_string(),
            transition,
            before: before_content,
            after: after_content,
            unified_diff: unified,
            before_metadata,
            after_metadata,
            metadata_changed,
        }
    }

    fn content_state(&self, state: &SnapshotState) -> ContentState {
        match state {
            SnapshotState::Absent => ContentState::Absent,
            SnapshotState::Present { content, .. } => {
                ContentState::from_bytes(content, self.config.max_diff_bytes)
            }
            SnapshotState::Unreadable(error) => ContentState::Unreadable {
                reason: error.to_string(),
            },
        }
    }
}

/// Join a relative tracked path onto the action's working directory
pub fn resolve_path(path: &str, base_dir: Option<&Path>) -> PathBuf {
    let path = Path::new(path);
    match base_dir {
        Some(base) if path.is_relative() => base.join(path),
        _ => path.to_path_buf(),
    }
}

fn classify(before: &SnapshotState, after: &SnapshotState) -> Transition {
    use SnapshotState::*;

    match (before, after) {
        (Absent, Absent) => Transition::Unchanged,
        (Absent, _) => Transition::Created,
        (_, Absent) => Transition::Deleted,
        (Present { content: a, .. }, Present { content: b, .. }) => {
            if a == b {
                Transition::Unchanged
            } else {
                Transition::Modified
            }
        }
        (Unreadable(_), _) | (_, Unreadable(_)) => Transition::Indeterminate,
    }
}

fn metadata_of(state: &SnapshotState) -> Option<FileMetadata> {
    match state {
        SnapshotState::Present { metadata, .. } => Some(metadata.clone()),
        _ => None,
    }
}

// Size follows content, so it is left out here.
fn same_attributes(a: &FileMetadata, b: &FileMetadata) -> bool {
    a.chain().len() == b.chain().len()
        && a.chain().iter().zip(b.chain()).all(|(x, y)| {
            x.path == y.path
                && x.owner == y.owner
                && x.group == y.group
                && x.file_type == y.file_type
                && x.mode == y.mode
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::file_probe::mocks::MemoryFileProbe;

    fn tracker(probe: &MemoryFileProbe) -> ModificationTracker {
        ModificationTracker::new(Arc::new(probe.clone()), TrackerConfig::default())
    }

    fn paths(items: &[&str]) -> TrackedPaths {
        TrackedPaths::new(items.iter().copied()).unwrap()
    }

    #[test]
    fn test_empty_input_is_unchanged() {
        let probe = MemoryFileProbe::new();
        let tracker = tracker(&probe);

        let snapshot = tracker.snapshot(&TrackedPaths::default(), None);
        let result = tracker.compare(snapshot);

        assert!(!result.changed());
        assert!(result.diffs().is_empty());
        assert!(result.warnings().is_empty());
        assert_eq!(probe.observe_count(), 0);
    }

    #[test]
    fn test_untouched_file_shows_no_difference() {
        let probe = MemoryFileProbe::new();
        probe.write("/etc/app.conf", "key=value\n");
        let tracker = tracker(&probe);

        let snapshot = tracker.snapshot(&paths(&["/etc/app.conf"]), None);
        let result = tracker.compare(snapshot);

        assert!(!result.changed());
        let record = &result.diffs()[0];
        assert_eq!(record.transition, Transition::Unchanged);
        assert!(record.unified_diff.is_empty());
        assert!(!record.metadata_changed);
    }

    #[test]
    fn test_content_change_produces_one_line_diff() {
        let probe = MemoryFileProbe::new();
        probe.write("/tmp/f.txt", "a");
        let tracker = tracker(&probe);

        let snapshot = tracker.snapshot(&paths(&["/tmp/f.txt"]), None);
        probe.write("/tmp/f.txt", "b");
        let result = tracker.compare(snapshot);

        assert!(result.changed());
        let record = &result.diffs()[0];
        assert_eq!(record.transition, Transition::Modified);
        assert!(record.unified_diff.contains("-a"));
        assert!(record.unified_diff.contains("+b"));
        let removed = record
            .unified_diff
            .lines()
            .filter(|l| l.starts_with('-') && !l.starts_with("---"))
            .count();
        let added = record
            .unified_diff
            .lines()
            .filter(|l| l.starts_with('+') && !l.starts_with("+++"))
            .count();
        assert_eq!((removed, added), (1, 1));
    }

    #[test]
    fn test_created_file_is_existence_transition() {
        let probe = MemoryFileProbe::new();
        let tracker = tracker(&probe);

        let snapshot = tracker.snapshot(&paths(&["/tmp/a.txt"]), None);
        assert!(!snapshot.files()[0].existed_before());

        probe.write("/tmp/a.txt", "hello");
        let result = tracker.compare(snapshot);

        assert!(result.changed());
        let record = &result.diffs()[0];
        assert_eq!(record.path, "/tmp/a.txt");
        assert_eq!(record.transition, Transition::Created);
        assert_eq!(record.before, ContentState::Absent);
        assert_eq!(
            record.after,
            ContentState::Text {
                content: "hello".to_string()
            }
        );
        assert!(record.unified_diff.is_empty());
    }

    #[test]
    fn test_deleted_file_is_existence_transition() {
        let probe = MemoryFileProbe::new();
        probe.write("/tmp/gone.txt", "bye\n");
        let tracker = tracker(&probe);

        let snapshot = tracker.snapshot(&paths(&["/tmp/gone.txt"]), None);
        probe.remove("/tmp/gone.txt");
        let result = tracker.compare(snapshot);

        assert!(result.changed());
        let record = &result.diffs()[0];
        assert_eq!(record.transition, Transition::Deleted);
        assert_eq!(record.after, ContentState::Absent);
        assert!(record.unified_diff.is_empty());
    }

    #[test]
    fn test_recreated_identical_file_is_unchanged() {
        let probe = MemoryFileProbe::new();
        probe.write("/tmp/r.txt", "same\n");
        let tracker = tracker(&probe);

        let snapshot = tracker.snapshot(&paths(&["/tmp/r.txt"]), None);
        probe.remove("/tmp/r.txt");
        probe.write("/tmp/r.txt", "same\n");
        let result = tracker.compare(snapshot);

        assert!(!result.changed());
        assert_eq!(result.diffs()[0].transition, Transition::Unchanged);
    }

    #[test]
    fn test_diffs_preserve_input_order() {
        let probe = MemoryFileProbe::new();
        probe.write("/c", "1");
        probe.write("/a", "1");
        probe.write("/b", "1");
        let tracker = tracker(&probe);

        let snapshot = tracker.snapshot(&paths(&["/c", "/a", "/b"]), None);
        probe.write("/b", "2");
        let result = tracker.compare(snapshot);

        let order: Vec<&str> = result.diffs().iter().map(|d| d.path.as_str()).collect();
        assert_eq!(order, vec!["/c", "/a", "/b"]);
        let changed: Vec<&str> = result.changed_records().map(|d| d.path.as_str()).collect();
        assert_eq!(changed, vec!["/b"]);
    }

    #[test]
    fn test_unreadable_file_does_not_mask_others() {
        let probe = MemoryFileProbe::new();
        probe.mkdir("/var/dir");
        probe.write("/var/ok.txt", "old\n");
        let tracker = tracker(&probe);

        let snapshot = tracker.snapshot(&paths(&["/var/dir", "/var/ok.txt"]), None);
        assert_eq!(snapshot.warnings().len(), 1);

        probe.write("/var/ok.txt", "new\n");
        let result = tracker.compare(snapshot);

        assert!(result.changed());
        assert_eq!(result.diffs()[0].transition, Transition::Indeterminate);
        assert_eq!(result.diffs()[1].transition, Transition::Modified);

        // One warning per phase for the directory
        let phases: Vec<TrackingPhase> = result.warnings().iter().map(|w| w.phase).collect();
        assert_eq!(phases, vec![TrackingPhase::Snapshot, TrackingPhase::Compare]);
        assert!(result
            .warnings()
            .iter()
            .all(|w| w.path == "/var/dir"));
    }

    #[test]
    fn test_permission_denied_after_action_is_indeterminate() {
        let probe = MemoryFileProbe::new();
        probe.write("/secret", "x");
        let tracker = tracker(&probe);

        let snapshot = tracker.snapshot(&paths(&["/secret"]), None);
        probe.deny("/secret");
        let result = tracker.compare(snapshot);

        assert!(!result.changed());
        assert_eq!(result.diffs()[0].transition, Transition::Indeterminate);
        assert!(matches!(
            result.diffs()[0].after,
            ContentState::Unreadable { .. }
        ));
        assert_eq!(result.warnings().len(), 1);
    }

    #[test]
    fn test_unreadable_path_created_by_action() {
        let probe = MemoryFileProbe::new();
        let tracker = tracker(&probe);

        let snapshot = tracker.snapshot(&paths(&["/new_dir"]), None);
        probe.mkdir("/new_dir");
        let result = tracker.compare(snapshot);

        assert!(result.changed());
        assert_eq!(result.diffs()[0].transition, Transition::Created);
    }

    #[test]
    fn test_binary_modification() {
        let probe = MemoryFileProbe::new();
        probe.write("/bin.dat", [0u8, 159, 146, 150]);
        let tracker = tracker(&probe);

        let snapshot = tracker.snapshot(&paths(&["/bin.dat"]), None);
        probe.write("/bin.dat", [0u8, 159, 146, 151]);
        let result = tracker.compare(snapshot);

        let record = &result.diffs()[0];
        assert_eq!(record.transition, Transition::Modified);
        match (&record.before, &record.after) {
            (ContentState::Binary { sha1: a, .. }, ContentState::Binary { sha1: b, .. }) => {
                assert_ne!(a, b)
            }
            other => panic!("expected binary states, got {:?}", other),
        }
        assert_eq!(
            record.unified_diff,
            "Binary files before//bin.dat and after//bin.dat differ\n"
        );
    }

    #[test]
    fn test_metadata_change_is_informational() {
        let probe = MemoryFileProbe::new();
        probe.write("/run.sh", "#!/bin/sh\n");
        let tracker = tracker(&probe);

        let snapshot = tracker.snapshot(&paths(&["/run.sh"]), None);
        probe.chmod("/run.sh", "-rwxr-xr-x");
        let result = tracker.compare(snapshot);

        assert!(!result.changed());
        assert!(result.diffs()[0].metadata_changed);
    }

    #[test]
    fn test_snapshot_is_not_affected_by_later_writes() {
        let probe = MemoryFileProbe::new();
        probe.write("/s", "before");
        let tracker = tracker(&probe);

        let snapshot = tracker.snapshot(&paths(&["/s"]), None);
        probe.write("/s", "after");

        assert_eq!(snapshot.files()[0].content(), b"before");
    }

    #[test]
    fn test_relative_paths_resolve_against_base_dir() {
        let probe = MemoryFileProbe::new();
        probe.write("/work/out.txt", "x");
        let tracker = tracker(&probe);

        let snapshot = tracker.snapshot(&paths(&["out.txt"]), Some(Path::new("/work")));

        let file = &snapshot.files()[0];
        assert_eq!(file.path(), "out.txt");
        assert_eq!(file.resolved(), Path::new("/work/out.txt"));
        assert!(file.existed_before());
    }

    #[test]
    fn test_configured_limits_apply() {
        let probe = MemoryFileProbe::new();
        probe.write("/notes.txt", "short\n");
        let tracker = ModificationTracker::new(
            Arc::new(probe.clone()),
            TrackerConfig {
                diff_context_lines: 0,
                max_diff_bytes: 8,
            },
        );
        assert_eq!(tracker.config().max_diff_bytes, 8);

        let snapshot = tracker.snapshot(&paths(&["/notes.txt"]), None);
        probe.write("/notes.txt", "much longer text\n");
        let result = tracker.compare(snapshot);

        let record = &result.diffs()[0];
        assert!(matches!(record.before, ContentState::Text { .. }));
        assert!(matches!(record.after, ContentState::Binary { size: 17, .. }));
        assert_eq!(
            record.unified_diff,
            "Binary files before//notes.txt and after//notes.txt differ\n"
        );
    }

    #[test]
    fn test_resolve_path_keeps_absolute() {
        assert_eq!(
            resolve_path("/etc/hosts", Some(Path::new("/work"))),
            PathBuf::from("/etc/hosts")
        );
        assert_eq!(resolve_path("a", None), PathBuf::from("a"));
    }
}
