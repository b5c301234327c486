// Command request model (the external action bracketed by tracking)

use super::error::{json_type_name, InputError};
use super::tracking::TrackedPaths;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// External action to execute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRequest {
    /// Program and arguments; in shell mode a single command string
    pub argv: Vec<String>,
    pub uses_shell: bool,
    pub chdir: Option<String>,
    pub stdin: Option<String>,
    pub stdin_add_newline: bool,
    pub expand_argument_vars: bool,
    pub strip_empty_ends: bool,
    pub timeout_ms: Option<u64>,
}

impl CommandRequest {
    /// Plain argv request with default options
    pub fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            uses_shell: false,
            chdir: None,
            stdin: None,
            stdin_add_newline: true,
            expand_argument_vars: true,
            strip_empty_ends: true,
            timeout_ms: None,
        }
    }

    /// Shell command string run through `/bin/sh -c`
    pub fn shell(command: impl Into<String>) -> Self {
        let mut request = Self::new([command.into()]);
        request.uses_shell = true;
        request
    }

    pub fn with_chdir(mut self, chdir: impl Into<String>) -> Self {
        self.chdir = Some(chdir.into());
        self
    }

    pub fn with_stdin(mut self, stdin: impl Into<String>) -> Self {
        self.stdin = Some(stdin.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn validate(&self) -> Result<(), InputError> {
        match self.argv.first() {
            Some(program) if !program.trim().is_empty() => Ok(()),
            _ => Err(InputError::NoCommand),
        }
    }
}

/// Module-style arguments: a command plus the optional `modifies` list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleArgs {
    pub command: CommandRequest,
    /// None when `modifies` was not given
    pub modifies: Option<TrackedPaths>,
}

impl ModuleArgs {
    /// Parse a JSON args document.
    ///
    /// Accepts the free-form command as `_raw_params` or `cmd`, or a list
    /// as `argv` (not both). All type errors surface as `InputError` before
    /// anything is executed.
    pub fn from_json(value: &Value) -> Result<Self, InputError> {
        let obj = value.as_object().ok_or_else(|| InputError::InvalidType {
            field: "args".to_string(),
            expected: "a dict".to_string(),
            found: json_type_name(value).to_string(),
        })?;

        let uses_shell = optional_bool(obj.get("_uses_shell"), "_uses_shell")?.unwrap_or(false);

        let raw = match optional_str(obj.get("_raw_params"), "_raw_params")? {
            Some(raw) => Some(raw),
            None => optional_str(obj.get("cmd"), "cmd")?,
        }
        .filter(|raw| !raw.trim().is_empty());

        let argv = match obj.get("argv") {
            None | Some(Value::Null) => None,
            Some(v) => Some(string_list("argv", v)?),
        }
        .filter(|argv| !argv.is_empty());

        let argv = match (raw, argv) {
            (Some(_), Some(_)) => return Err(InputError::ConflictingCommand),
            (None, None) => return Err(InputError::NoCommand),
            (Some(raw), None) if uses_shell => vec![raw],
            (Some(raw), None) => split_free_form(&raw)?,
            (None, Some(argv)) if uses_shell => vec![quote_argv(&argv)?],
            (None, Some(argv)) => argv,
        };

        let command = CommandRequest {
            argv,
            uses_shell,
            chdir: optional_str(obj.get("chdir"), "chdir")?,
            stdin: optional_str(obj.get("stdin"), "stdin")?,
            stdin_add_newline: optional_bool(obj.get("stdin_add_newline"), "stdin_add_newline")?
                .unwrap_or(true),
            expand_argument_vars: optional_bool(
                obj.get("expand_argument_vars"),
                "expand_argument_vars",
            )?
            .unwrap_or(true),
            strip_empty_ends: optional_bool(obj.get("strip_empty_ends"), "strip_empty_ends")?
                .unwrap_or(true),
            timeout_ms: optional_u64(obj.get("timeout_ms"), "timeout_ms")?,
        };
        command.validate()?;

        // An empty list tracks nothing, same as leaving it out
        let modifies = match obj.get("modifies") {
            None | Some(Value::Null) => None,
            Some(v) => Some(TrackedPaths::from_json("modifies", v)?),
        }
        .filter(|paths| !paths.is_empty());

        Ok(Self { command, modifies })
    }
}

fn string_list(field: &str, value: &Value) -> Result<Vec<String>, InputError> {
    let items = value.as_array().ok_or_else(|| InputError::NotAList {
        field: field.to_string(),
        found: json_type_name(value).to_string(),
    })?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            item.as_str()
                .map(str::to_string)
                .ok_or_else(|| InputError::NonStringEntry {
                    field: field.to_string(),
                    index,
                    found: json_type_name(item).to_string(),
                })
        })
        .collect()
}

/// Join argv into one shell command line, quoting each element
fn quote_argv(argv: &[String]) -> Result<String, InputError> {
    shlex::try_join(argv.iter().map(String::as_str)).map_err(|e| InputError::InvalidType {
        field: "argv".to_string(),
        expected: "shell-quotable arguments".to_string(),
        found: e.to_string(),
    })
}

fn split_free_form(raw: &str) -> Result<Vec<String>, InputError> {
    shlex::split(raw).ok_or_else(|| InputError::InvalidType {
        field: "cmd".to_string(),
        expected: "a shell-quoted command line".to_string(),
        found: "unbalanced quotes".to_string(),
    })
}

fn optional_str(value: Option<&Value>, field: &str) -> Result<Option<String>, InputError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(type_error(field, "a string", other)),
    }
}

fn optional_bool(value: Option<&Value>, field: &str) -> Result<Option<bool>, InputError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(other) => Err(type_error(field, "a bool", other)),
    }
}

fn optional_u64(value: Option<&Value>, field: &str) -> Result<Option<u64>, InputError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_u64()
            .map(Some)
            .ok_or_else(|| type_error(field, "a non-negative integer", v)),
    }
}

fn type_error(field: &str, expected: &str, found: &Value) -> InputError {
    InputError::InvalidType {
        field: field.to_string(),
        expected: expected.to_string(),
        found: json_type_name(found).to_string(),
    }
}
