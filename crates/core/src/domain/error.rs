// Domain Error Types

use serde::Serialize;
use thiserror::Error;

/// A tracked path exists but its content cannot be captured.
///
/// Always reported per file; never aborts a tracking run.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccessError {
    #[error("Permission denied: {path}")]
    PermissionDenied { path: String },

    #[error("Not a regular file: {path} ({file_type})")]
    NotRegularFile { path: String, file_type: String },

    #[error("Cyclic symlinks detected: {}", chain.join(" -> "))]
    SymlinkCycle { path: String, chain: Vec<String> },

    #[error("Failed to read {path}: {reason}")]
    Io { path: String, reason: String },
}

impl AccessError {
    pub fn path(&self) -> &str {
        match self {
            AccessError::PermissionDenied { path }
            | AccessError::NotRegularFile { path, .. }
            | AccessError::SymlinkCycle { path, .. }
            | AccessError::Io { path, .. } => path,
        }
    }
}

/// Malformed module arguments; raised before the external action runs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("'{field}' must be a list of strings, got {found}")]
    NotAList { field: String, found: String },

    #[error("'{field}[{index}]' must be a string, got {found}")]
    NonStringEntry {
        field: String,
        index: usize,
        found: String,
    },

    #[error("'{field}[{index}]' is an empty path")]
    EmptyPath { field: String, index: usize },

    #[error("'{field}[{index}]' contains a NUL byte")]
    NulByte { field: String, index: usize },

    #[error("'{field}' must be {expected}, got {found}")]
    InvalidType {
        field: String,
        expected: String,
        found: String,
    },

    #[error("no command given")]
    NoCommand,

    #[error("only command or argv can be given, not both")]
    ConflictingCommand,
}

/// JSON type name used in error messages
pub(crate) fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "list",
        serde_json::Value::Object(_) => "dict",
    }
}
