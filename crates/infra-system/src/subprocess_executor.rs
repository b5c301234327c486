// Subprocess executor implementation
// reason: async-trait, tokio for async process management
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{info, warn};

use shelldiff_core::domain::CommandRequest;
use shelldiff_core::port::task_executor::{
    ExecutionError, ExecutionResult, ExecutionStatus, TaskExecutor,
};
use shelldiff_core::port::TimeProvider;

/// Shell used for `uses_shell` requests
const DEFAULT_SHELL: &str = "/bin/sh";

/// Subprocess executor
/// Spawns child processes with environment allowlisting
pub struct SubprocessExecutor {
    time_provider: Arc<dyn TimeProvider>,
    env_allowlist: Vec<String>,
}

impl SubprocessExecutor {
    /// Create a new subprocess executor
    ///
    /// # Arguments
    /// * `time_provider` - Time provider for duration tracking
    /// * `env_allowlist` - Environment variables passed through to the child
    ///
    /// # Example
    /// ```ignore
    /// let executor = SubprocessExecutor::new(
    ///     Arc::new(SystemTimeProvider),
    ///     vec!["PATH".to_string(), "HOME".to_string(), "USER".to_string()],
    /// );
    /// ```
    pub fn new(time_provider: Arc<dyn TimeProvider>, env_allowlist: Vec<String>) -> Self {
        Self {
            time_provider,
            env_allowlist,
        }
    }

    /// Filter environment variables to allowlist only
    fn filter_env(&self, env: &HashMap<String, String>) -> HashMap<String, String> {
        env.iter()
            .filter(|(k, _)| self.env_allowlist.contains(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Build the argv actually executed (shell wrapping, `$VAR`/`~` expansion)
    fn build_argv(&self, request: &CommandRequest) -> Result<Vec<String>, ExecutionError> {
        request
            .validate()
            .map_err(|e| ExecutionError::InvalidRequest(e.to_string()))?;

        if request.uses_shell {
            return Ok(vec![
                DEFAULT_SHELL.to_string(),
                "-c".to_string(),
                request.argv.join(" "),
            ]);
        }

        if !request.expand_argument_vars {
            return Ok(request.argv.clone());
        }

        let env = self.filter_env(&std::env::vars().collect());
        request
            .argv
            .iter()
            .map(|arg| {
                shellexpand::full_with_context_no_errors(
                    arg,
                    || env.get("HOME").map(String::as_str),
                    |name| env.get(name).map(String::as_str),
                )
                .into_owned()
            })
            .map(Ok)
            .collect()
    }

    /// Spawn child process and wait for output
    async fn spawn_and_wait(
        &self,
        argv: &[String],
        request: &CommandRequest,
    ) -> Result<std::process::Output, ExecutionError> {
        let filtered_env = self.filter_env(&std::env::vars().collect());

        let (program, args) = argv
            .split_first()
            .ok_or_else(|| ExecutionError::InvalidRequest("empty argv".to_string()))?;

        let mut command = Command::new(program);
        command
            .args(args)
            .env_clear()
            .envs(&filtered_env)
            .stdin(if request.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(chdir) = &request.chdir {
            if !Path::new(chdir).is_dir() {
                return Err(ExecutionError::Chdir(format!(
                    "{}: not a directory",
                    chdir
                )));
            }
            command.current_dir(chdir);
        }

        let mut child = command
            .spawn()
            .map_err(|e| ExecutionError::SpawnFailed(e.to_string()))?;

        if let Some(data) = &request.stdin {
            if let Some(mut stdin) = child.stdin.take() {
                let mut payload = data.clone().into_bytes();
                if request.stdin_add_newline {
                    payload.push(b'\n');
                }
                stdin
                    .write_all(&payload)
                    .await
                    .map_err(|e| ExecutionError::IoError(e.to_string()))?;
                // Dropping closes the pipe so the child sees EOF
                drop(stdin);
            }
        }

        if let Some(timeout_ms) = request.timeout_ms {
            match timeout(Duration::from_millis(timeout_ms), child.wait_with_output()).await {
                Ok(Ok(output)) => Ok(output),
                Ok(Err(e)) => Err(ExecutionError::IoError(e.to_string())),
                Err(_) => Err(ExecutionError::Timeout(timeout_ms)),
            }
        } else {
            child
                .wait_with_output()
                .await
                .map_err(|e| ExecutionError::IoError(e.to_string()))
        }
    }

    /// Build execution result from process output
    fn build_result(
        &self,
        output: std::process::Output,
        duration_ms: i64,
        argv: Vec<String>,
    ) -> ExecutionResult {
        let status = if output.status.success() {
            ExecutionStatus::Success
        } else {
            ExecutionStatus::Failed
        };

        ExecutionResult {
            status,
            exit_code: output.status.code(),
            duration_ms,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            cmd: argv,
        }
    }
}

#[async_trait]
impl TaskExecutor for SubprocessExecutor {
    async fn execute(&self, request: &CommandRequest) -> Result<ExecutionResult, ExecutionError> {
        let argv = self.build_argv(request)?;
        let start_time = self.time_provider.now_millis();

        info!(
            argv = ?argv,
            chdir = ?request.chdir,
            timeout_ms = ?request.timeout_ms,
            "Starting subprocess execution"
        );

        let output = match self.spawn_and_wait(&argv, request).await {
            Ok(output) => output,
            Err(e) => {
                warn!(argv = ?argv, error = %e, "Subprocess execution failed");
                return Err(e);
            }
        };

        let duration_ms = self.time_provider.now_millis() - start_time;
        let result = self.build_result(output, duration_ms, argv);

        info!(
            duration_ms = %duration_ms,
            exit_code = ?result.exit_code,
            status = ?result.status,
            "Subprocess execution completed"
        );

        Ok(result)
    }
}
