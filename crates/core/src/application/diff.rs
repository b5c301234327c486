// Unified diff rendering for modified tracked files

use similar::TextDiff;

/// Render a line-based unified diff between two text contents
///
/// Headers are `before/<path>` and `after/<path>`. Returns an empty string
/// when the contents are equal.
pub fn unified_diff(path: &str, before: &str, after: &str, context_lines: usize) -> String {
    if before == after {
        return String::new();
    }

    TextDiff::from_lines(before, after)
        .unified_diff()
        .context_radius(context_lines)
        .header(&format!("before/{}", path), &format!("after/{}", path))
        .to_string()
}

/// Placeholder diff for content that is not shown as text
pub fn binary_diff(path: &str) -> String {
    format!("Binary files before/{} and after/{} differ\n", path, path)
}
