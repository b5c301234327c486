// shelldiff Infrastructure - System Adapters
// Implements: FileProbe, TaskExecutor

pub mod local_file_probe;
pub mod subprocess_executor;

pub use local_file_probe::LocalFileProbe;
pub use subprocess_executor::SubprocessExecutor;
