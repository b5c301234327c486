// Port Layer - Interfaces for external dependencies

pub mod file_probe;
pub mod task_executor;
pub mod time_provider; // For deterministic testing

// Re-exports
pub use file_probe::FileProbe;
pub use task_executor::{ExecutionError, ExecutionResult, ExecutionStatus, TaskExecutor};
pub use time_provider::TimeProvider;
