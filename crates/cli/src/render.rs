//! Human-readable diff rendering (`--diff`)

use colored::Colorize;
use shelldiff_core::domain::{ContentState, DiffRecord, TrackingResult, Transition};

/// Render changed records and warnings, one block per file
pub fn render_tracking(tracking: &TrackingResult) -> String {
    let mut out = String::new();

    for record in tracking.changed_records() {
        out.push_str(&render_record(record));
    }
    for warning in tracking.warnings() {
        out.push_str(&format!("{} {}\n", "warning:".yellow().bold(), warning));
    }
    out
}

fn render_record(record: &DiffRecord) -> String {
    match record.transition {
        Transition::Created => format!(
            "{} {} ({})\n",
            "created".green().bold(),
            record.path,
            describe(&record.after)
        ),
        Transition::Deleted => format!(
            "{} {} (was {})\n",
            "deleted".red().bold(),
            record.path,
            describe(&record.before)
        ),
        _ => record
            .unified_diff
            .lines()
            .map(colorize_line)
            .map(|line| format!("{}\n", line))
            .collect(),
    }
}

fn colorize_line(line: &str) -> String {
    if line.starts_with("+++") || line.starts_with("---") {
        line.bold().to_string()
    } else if line.starts_with("@@") {
        line.cyan().to_string()
    } else if line.starts_with('+') {
        line.green().to_string()
    } else if line.starts_with('-') {
        line.red().to_string()
    } else {
        line.to_string()
    }
}

fn describe(content: &ContentState) -> String {
    match content {
        ContentState::Absent => "absent".to_string(),
        ContentState::Text { content } => format!("{} bytes of text", content.len()),
        ContentState::Binary { size, sha1 } => format!("{} bytes, sha1 {}", size, sha1),
        ContentState::Unreadable { reason } => format!("unreadable: {}", reason),
    }
}
