// Tracking constants (No magic values)

/// Lines of context around each unified diff hunk
pub const DEFAULT_DIFF_CONTEXT_LINES: usize = 3;

/// Content larger than this (1 MiB) is fingerprinted instead of diffed
pub const DEFAULT_MAX_DIFF_BYTES: u64 = 1024 * 1024;

/// Environment variables passed through to the action by default
pub const DEFAULT_ENV_ALLOWLIST: &[&str] = &["PATH", "HOME", "USER", "LANG", "LC_ALL", "TERM"];

/// Host result message for a failed command
pub const MSG_NON_ZERO_RC: &str = "non-zero return code";

/// Timestamp layout used for `start`/`end` in host results
pub const HOST_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";
