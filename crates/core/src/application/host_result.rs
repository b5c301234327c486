// Host Result Adapter
// Maps a tracked run onto the command module's result conventions
// (`changed`, `diff`, `rc`, `stdout`, ...). Pure: no I/O, no shared state.

use super::constants::{HOST_TIMESTAMP_FORMAT, MSG_NON_ZERO_RC};
use super::tracked_run::TrackedRunOutcome;
use crate::domain::{ContentState, DiffRecord, FileMetadata};
use chrono::{DateTime, Local};
use serde::Serialize;

/// Result document returned to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostResult {
    pub changed: bool,
    pub failed: bool,
    pub rc: Option<i32>,
    pub cmd: Vec<String>,
    pub stdout: String,
    pub stderr: String,
    pub stdout_lines: Vec<String>,
    pub stderr_lines: Vec<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub delta: Option<String>,
    pub msg: String,
    /// Present only when `modifies` was given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<Vec<HostDiff>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// One changed file, as shown to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostDiff {
    pub before: HostDiffSide,
    pub after: HostDiffSide,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub unified_diff: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostDiffSide {
    pub path: String,
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stat: Option<FileMetadata>,
}

/// Build the host result for a finished run
///
/// `changed` is true once the command ran; when files were tracked it is
/// replaced by the tracking verdict. `diff` lists only changed files and,
/// for a created or deleted file, only its state.
pub fn to_host_result(outcome: &TrackedRunOutcome) -> HostResult {
    let strip = outcome.request.strip_empty_ends;

    let mut result = HostResult {
        changed: outcome.ran(),
        failed: false,
        rc: None,
        cmd: outcome.request.argv.clone(),
        stdout: String::new(),
        stderr: String::new(),
        stdout_lines: Vec::new(),
        stderr_lines: Vec::new(),
        start: None,
        end: None,
        delta: None,
        msg: String::new(),
        diff: None,
        warnings: Vec::new(),
    };

    match &outcome.execution {
        Ok(execution) => {
            result.rc = execution.exit_code;
            result.cmd = execution.cmd.clone();
            result.stdout = strip_output(&execution.stdout, strip);
            result.stderr = strip_output(&execution.stderr, strip);
            result.start = format_timestamp(outcome.started_at_ms);
            result.end = format_timestamp(outcome.finished_at_ms);
            result.delta = Some(format_delta(outcome.finished_at_ms - outcome.started_at_ms));
            if execution.exit_code != Some(0) {
                result.failed = true;
                result.msg = MSG_NON_ZERO_RC.to_string();
            }
        }
        Err(e) => {
            result.failed = true;
            result.msg = e.to_string();
        }
    }
    result.stdout_lines = result.stdout.lines().map(str::to_string).collect();
    result.stderr_lines = result.stderr.lines().map(str::to_string).collect();

    if let Some(tracking) = &outcome.tracking {
        result.changed = tracking.changed();
        result.diff = Some(tracking.changed_records().map(host_diff).collect());
        result.warnings = tracking.warnings().iter().map(|w| w.to_string()).collect();
    }

    result
}

fn host_diff(record: &DiffRecord) -> HostDiff {
    let existence_only = record.transition.is_existence_change();
    HostDiff {
        before: diff_side(
            &record.path,
            &record.before,
            record.before_metadata.as_ref(),
            existence_only,
        ),
        after: diff_side(
            &record.path,
            &record.after,
            record.after_metadata.as_ref(),
            existence_only,
        ),
        unified_diff: record.unified_diff.clone(),
    }
}

fn diff_side(
    path: &str,
    content: &ContentState,
    metadata: Option<&FileMetadata>,
    existence_only: bool,
) -> HostDiffSide {
    let mut side = HostDiffSide {
        path: path.to_string(),
        state: content.state_name().to_string(),
        content: None,
        sha1: None,
        size: None,
        stat: None,
    };
    if existence_only {
        return side;
    }

    side.stat = metadata.cloned();
    match content {
        ContentState::Text { content } => side.content = Some(content.clone()),
        ContentState::Binary { size, sha1 } => {
            side.sha1 = Some(sha1.clone());
            side.size = Some(*size);
        }
        ContentState::Unreadable { reason } => side.content = Some(reason.clone()),
        ContentState::Absent => {}
    }
    side
}

fn strip_output(output: &str, strip: bool) -> String {
    if strip {
        output.trim_end_matches(&['\r', '\n'][..]).to_string()
    } else {
        output.to_string()
    }
}

/// Local wall-clock time, e.g. `2017-09-29 22:03:48.083128`
pub fn format_timestamp(millis: i64) -> Option<String> {
    DateTime::from_timestamp_millis(millis).map(|utc| {
        utc.with_timezone(&Local)
            .format(HOST_TIMESTAMP_FORMAT)
            .to_string()
    })
}

/// Elapsed time as `H:MM:SS.ffffff`
pub fn format_delta(millis: i64) -> String {
    let millis = millis.max(0);
    let hours = millis / 3_600_000;
    let minutes = (millis / 60_000) % 60;
    let seconds = (millis / 1000) % 60;
    let micros = (millis % 1000) * 1000;
    format!("{}:{:02}:{:02}.{:06}", hours, minutes, seconds, micros)
}
