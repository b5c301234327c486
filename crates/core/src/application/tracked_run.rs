// Tracked Run Use Case
// snapshot -> execute -> compare, strictly in sequence

use super::tracker::ModificationTracker;
use crate::domain::{CommandRequest, ModuleArgs, TrackingResult};
use crate::error::Result;
use crate::port::{ExecutionError, ExecutionResult, TaskExecutor, TimeProvider};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Everything observed while running one action
#[derive(Debug, Clone)]
pub struct TrackedRunOutcome {
    pub request: CommandRequest,
    pub execution: std::result::Result<ExecutionResult, ExecutionError>,
    /// None when `modifies` was absent or empty
    pub tracking: Option<TrackingResult>,
    pub started_at_ms: i64,
    pub finished_at_ms: i64,
}

impl TrackedRunOutcome {
    /// The action started and exited (with any code)
    pub fn ran(&self) -> bool {
        self.execution.is_ok()
    }
}

/// Brackets an external action with modification tracking
pub struct TrackedRunService {
    tracker: Arc<ModificationTracker>,
    executor: Arc<dyn TaskExecutor>,
    time_provider: Arc<dyn TimeProvider>,
}

impl TrackedRunService {
    pub fn new(
        tracker: Arc<ModificationTracker>,
        executor: Arc<dyn TaskExecutor>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            tracker,
            executor,
            time_provider,
        }
    }

    /// Run the action described by `args`
    ///
    /// # Errors
    /// - AppError::Input if the command is malformed; nothing is executed
    ///
    /// Failure of the action itself is captured in the outcome and the
    /// compare phase still runs against whatever state the files are in.
    pub async fn run(&self, args: ModuleArgs) -> Result<TrackedRunOutcome> {
        let ModuleArgs { command, modifies } = args;
        command.validate()?;

        let base_dir = command.chdir.as_deref().map(Path::new);
        // An empty list tracks nothing, same as no list
        let snapshot = modifies
            .as_ref()
            .filter(|paths| !paths.is_empty())
            .map(|paths| self.tracker.snapshot(paths, base_dir));

        let started_at_ms = self.time_provider.now_millis();
        let execution = self.executor.execute(&command).await;
        let finished_at_ms = self.time_provider.now_millis();

        match &execution {
            Ok(result) => info!(
                exit_code = ?result.exit_code,
                duration_ms = result.duration_ms,
                "Action finished"
            ),
            Err(e) => warn!(error = %e, "Action failed to run; comparing tracked files anyway"),
        }

        let tracking = snapshot.map(|snapshot| self.tracker.compare(snapshot));

        Ok(TrackedRunOutcome {
            request: command,
            execution,
            tracking,
            started_at_ms,
            finished_at_ms,
        })
    }
}
