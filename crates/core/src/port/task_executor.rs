// Task Executor Port
// Abstraction for executing the external action bracketed by tracking

use crate::domain::CommandRequest;
use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Result of a completed action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
    pub duration_ms: i64,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// Argv as actually executed (after expansion)
    pub cmd: Vec<String>,
}

/// Execution status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Success,
    Failed,
}

/// Execution errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("Spawn failed: {0}")]
    SpawnFailed(String),

    #[error("Process timeout after {0}ms")]
    Timeout(u64),

    #[error("Unable to change directory before execution: {0}")]
    Chdir(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("IO error: {0}")]
    IoError(String),
}

/// Task Executor trait
///
/// Implementations:
/// - SubprocessExecutor: spawns an external process
/// - MockTaskExecutor: runs a closure against in-memory state (tests)
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Execute a command and return the result
    ///
    /// A non-zero exit status is a successful execution with
    /// `ExecutionStatus::Failed`, not an error.
    ///
    /// # Errors
    /// - ExecutionError::SpawnFailed if the process cannot be started
    /// - ExecutionError::Timeout if execution exceeds `timeout_ms`
    /// - ExecutionError::Chdir if the working directory is unusable
    async fn execute(&self, request: &CommandRequest) -> Result<ExecutionResult, ExecutionError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    type SideEffect = Box<dyn Fn() + Send + Sync>;

    /// Mock executor behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Exit with the given code
        Exit(i32),
        /// Fail to spawn with message
        Fail(String),
        /// Timeout after N ms
        Timeout(u64),
    }

    /// Mock Task Executor for testing
    ///
    /// The side effect runs before the behavior is applied, so a failing
    /// action can still have touched files.
    pub struct MockTaskExecutor {
        behavior: MockBehavior,
        side_effect: Option<SideEffect>,
        call_count: Arc<Mutex<usize>>,
    }

    impl MockTaskExecutor {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior,
                side_effect: None,
                call_count: Arc::new(Mutex::new(0)),
            }
        }

        pub fn new_success() -> Self {
            Self::new(MockBehavior::Exit(0))
        }

        pub fn new_fail(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::Fail(message.into()))
        }

        pub fn with_side_effect(mut self, effect: impl Fn() + Send + Sync + 'static) -> Self {
            self.side_effect = Some(Box::new(effect));
            self
        }

        pub fn call_count(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl TaskExecutor for MockTaskExecutor {
        async fn execute(
            &self,
            request: &CommandRequest,
        ) -> Result<ExecutionResult, ExecutionError> {
            *self.call_count.lock().unwrap() += 1;

            if let Some(effect) = &self.side_effect {
                effect();
            }

            match &self.behavior {
                MockBehavior::Exit(code) => Ok(ExecutionResult {
                    status: if *code == 0 {
                        ExecutionStatus::Success
                    } else {
                        ExecutionStatus::Failed
                    },
                    duration_ms: 10,
                    exit_code: Some(*code),
                    stdout: "mock output\n".to_string(),
                    stderr: String::new(),
                    cmd: request.argv.clone(),
                }),
                MockBehavior::Fail(msg) => Err(ExecutionError::SpawnFailed(msg.clone())),
                MockBehavior::Timeout(ms) => Err(ExecutionError::Timeout(*ms)),
            }
        }
    }
}
