// Modification tracking model: tracked paths, snapshots, diff records

use super::error::{json_type_name, AccessError, InputError};
use super::file::FileMetadata;
use serde::Serialize;
use sha1::{Digest, Sha1};
use std::path::{Path, PathBuf};

/// Validated, ordered list of paths designated via `modifies`.
///
/// Duplicates collapse onto their first occurrence so each path is
/// snapshotted exactly once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackedPaths(Vec<String>);

impl TrackedPaths {
    pub fn new<I, S>(paths: I) -> Result<Self, InputError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for (index, path) in paths.into_iter().enumerate() {
            let path = path.into();
            validate_path("modifies", index, &path)?;
            if !unique.contains(&path) {
                unique.push(path);
            }
        }
        Ok(Self(unique))
    }

    /// Parse a JSON argument that must be a list of strings
    pub fn from_json(field: &str, value: &serde_json::Value) -> Result<Self, InputError> {
        let items = value.as_array().ok_or_else(|| InputError::NotAList {
            field: field.to_string(),
            found: json_type_name(value).to_string(),
        })?;

        let mut paths = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let path = item.as_str().ok_or_else(|| InputError::NonStringEntry {
                field: field.to_string(),
                index,
                found: json_type_name(item).to_string(),
            })?;
            paths.push(path.to_string());
        }
        Self::new(paths)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn validate_path(field: &str, index: usize, path: &str) -> Result<(), InputError> {
    if path.is_empty() {
        return Err(InputError::EmptyPath {
            field: field.to_string(),
            index,
        });
    }
    if path.contains('\0') {
        return Err(InputError::NulByte {
            field: field.to_string(),
            index,
        });
    }
    Ok(())
}

/// Pre-action state of one tracked file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotState {
    Absent,
    Present {
        content: Vec<u8>,
        metadata: FileMetadata,
    },
    Unreadable(AccessError),
}

/// A tracked file and its snapshot. Immutable once taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedFile {
    path: String,
    resolved: PathBuf,
    state: SnapshotState,
}

impl TrackedFile {
    pub fn new(path: impl Into<String>, resolved: impl Into<PathBuf>, state: SnapshotState) -> Self {
        Self {
            path: path.into(),
            resolved: resolved.into(),
            state,
        }
    }

    /// Path as supplied by the caller
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Path actually read (relative paths joined onto the working directory)
    pub fn resolved(&self) -> &Path {
        &self.resolved
    }

    pub fn state(&self) -> &SnapshotState {
        &self.state
    }

    /// An unreadable path still exists
    pub fn existed_before(&self) -> bool {
        !matches!(self.state, SnapshotState::Absent)
    }

    /// Snapshot content; empty when the file did not exist or was unreadable
    pub fn content(&self) -> &[u8] {
        match &self.state {
            SnapshotState::Present { content, .. } => content,
            _ => &[],
        }
    }

    pub fn metadata(&self) -> Option<&FileMetadata> {
        match &self.state {
            SnapshotState::Present { metadata, .. } => Some(metadata),
            _ => None,
        }
    }
}

/// Which phase a warning was raised in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingPhase {
    Snapshot,
    Compare,
}

impl std::fmt::Display for TrackingPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackingPhase::Snapshot => write!(f, "snapshot"),
            TrackingPhase::Compare => write!(f, "compare"),
        }
    }
}

/// Non-fatal per-file read failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackingWarning {
    pub path: String,
    pub phase: TrackingPhase,
    pub error: AccessError,
}

impl std::fmt::Display for TrackingWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.path, self.phase, self.error)
    }
}

/// Sealed output of the snapshot phase, consumed by compare
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    files: Vec<TrackedFile>,
    warnings: Vec<TrackingWarning>,
}

impl Snapshot {
    pub(crate) fn new(files: Vec<TrackedFile>, warnings: Vec<TrackingWarning>) -> Self {
        Self { files, warnings }
    }

    pub fn files(&self) -> &[TrackedFile] {
        &self.files
    }

    pub fn warnings(&self) -> &[TrackingWarning] {
        &self.warnings
    }

    pub(crate) fn into_parts(self) -> (Vec<TrackedFile>, Vec<TrackingWarning>) {
        (self.files, self.warnings)
    }
}

/// Displayable content of one side of a diff record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ContentState {
    Absent,
    Text { content: String },
    Binary { size: u64, sha1: String },
    Unreadable { reason: String },
}

impl ContentState {
    /// Text when valid UTF-8 and at most `max_text_bytes`, otherwise a fingerprint
    pub fn from_bytes(bytes: &[u8], max_text_bytes: u64) -> Self {
        if (bytes.len() as u64) <= max_text_bytes {
            if let Ok(text) = std::str::from_utf8(bytes) {
                return ContentState::Text {
                    content: text.to_string(),
                };
            }
        }
        ContentState::Binary {
            size: bytes.len() as u64,
            sha1: sha1_hex(bytes),
        }
    }

    pub fn exists(&self) -> bool {
        !matches!(self, ContentState::Absent)
    }

    /// "absent" / "present", the only keys shown on an existence change
    pub fn state_name(&self) -> &'static str {
        if self.exists() {
            "present"
        } else {
            "absent"
        }
    }
}

pub fn sha1_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha1::digest(bytes))
}

/// How a tracked file moved between snapshot and compare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    Unchanged,
    Modified,
    Created,
    Deleted,
    /// One side exists but could not be read
    Indeterminate,
}

impl Transition {
    pub fn is_change(&self) -> bool {
        matches!(
            self,
            Transition::Modified | Transition::Created | Transition::Deleted
        )
    }

    pub fn is_existence_change(&self) -> bool {
        matches!(self, Transition::Created | Transition::Deleted)
    }
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transition::Unchanged => write!(f, "unchanged"),
            Transition::Modified => write!(f, "modified"),
            Transition::Created => write!(f, "created"),
            Transition::Deleted => write!(f, "deleted"),
            Transition::Indeterminate => write!(f, "indeterminate"),
        }
    }
}

/// Per-file before/after comparison
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffRecord {
    pub path: String,
    pub transition: Transition,
    pub before: ContentState,
    pub after: ContentState,
    /// Unified diff; empty unless content differs on both-present files
    pub unified_diff: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before_metadata: Option<FileMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after_metadata: Option<FileMetadata>,
    /// Stat chain differs (mode, owner, ...); informational only
    pub metadata_changed: bool,
}

impl DiffRecord {
    pub fn is_changed(&self) -> bool {
        self.transition.is_change()
    }
}

/// Aggregate result of one tracking run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackingResult {
    changed: bool,
    diffs: Vec<DiffRecord>,
    warnings: Vec<TrackingWarning>,
}

impl TrackingResult {
    pub fn new(diffs: Vec<DiffRecord>, warnings: Vec<TrackingWarning>) -> Self {
        let changed = diffs.iter().any(DiffRecord::is_changed);
        Self {
            changed,
            diffs,
            warnings,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    pub fn changed(&self) -> bool {
        self.changed
    }

    /// One record per tracked path, in input order
    pub fn diffs(&self) -> &[DiffRecord] {
        &self.diffs
    }

    pub fn changed_records(&self) -> impl Iterator<Item = &DiffRecord> {
        self.diffs.iter().filter(|d| d.is_changed())
    }

    pub fn warnings(&self) -> &[TrackingWarning] {
        &self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tracked_paths_dedup_preserves_order() {
        let paths = TrackedPaths::new(["b.txt", "a.txt", "b.txt", "c.txt"]).unwrap();
        assert_eq!(paths.as_slice(), &["b.txt", "a.txt", "c.txt"]);
    }

    #[test]
    fn test_tracked_paths_rejects_empty() {
        let err = TrackedPaths::new(["a.txt", ""]).unwrap_err();
        assert_eq!(
            err,
            InputError::EmptyPath {
                field: "modifies".to_string(),
                index: 1
            }
        );
    }

    #[test]
    fn test_tracked_paths_rejects_nul() {
        let err = TrackedPaths::new(["a\0b"]).unwrap_err();
        assert!(matches!(err, InputError::NulByte { index: 0, .. }));
    }

    #[test]
    fn test_from_json_not_a_list() {
        let err = TrackedPaths::from_json("modifies", &json!("/etc/hosts")).unwrap_err();
        assert!(err.to_string().contains("must be a list of strings"));
        assert!(err.to_string().contains("string"));
    }

    #[test]
    fn test_from_json_non_string_entry() {
        let err = TrackedPaths::from_json("modifies", &json!(["/a", 42])).unwrap_err();
        assert_eq!(
            err,
            InputError::NonStringEntry {
                field: "modifies".to_string(),
                index: 1,
                found: "number".to_string()
            }
        );
    }

    #[test]
    fn test_from_json_valid() {
        let paths = TrackedPaths::from_json("modifies", &json!(["/a", "b"])).unwrap();
        assert_eq!(paths.len(), 2);
    }

    #[test]
    fn test_content_state_text_and_binary() {
        assert_eq!(
            ContentState::from_bytes(b"hello", 1024),
            ContentState::Text {
                content: "hello".to_string()
            }
        );

        let binary = ContentState::from_bytes(&[0xff, 0xfe, 0x00], 1024);
        assert!(matches!(binary, ContentState::Binary { size: 3, .. }));

        // Oversized text is fingerprinted
        let big = ContentState::from_bytes(b"0123456789", 4);
        assert!(matches!(big, ContentState::Binary { size: 10, .. }));
    }

    #[test]
    fn test_sha1_hex() {
        assert_eq!(sha1_hex(b"abc"), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn test_content_state_serialization() {
        assert_eq!(
            serde_json::to_value(ContentState::Absent).unwrap(),
            json!({"state": "absent"})
        );
        assert_eq!(
            serde_json::to_value(ContentState::Text {
                content: "hello".to_string()
            })
            .unwrap(),
            json!({"state": "text", "content": "hello"})
        );
    }

    #[test]
    fn test_empty_result_is_unchanged() {
        let result = TrackingResult::empty();
        assert!(!result.changed());
        assert!(result.diffs().is_empty());
    }

    #[test]
    fn test_tracked_file_accessors() {
        let absent = TrackedFile::new("a", "/w/a", SnapshotState::Absent);
        assert!(!absent.existed_before());
        assert!(absent.content().is_empty());

        let unreadable = TrackedFile::new(
            "d",
            "/w/d",
            SnapshotState::Unreadable(AccessError::PermissionDenied {
                path: "d".to_string(),
            }),
        );
        assert!(unreadable.existed_before());
        assert!(unreadable.metadata().is_none());
    }
}
