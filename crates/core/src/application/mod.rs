// Application Layer - Use Cases

pub mod constants;
pub mod diff;
pub mod host_result;
pub mod tracked_run;
pub mod tracker;

// Re-exports
pub use host_result::{to_host_result, HostDiff, HostDiffSide, HostResult};
pub use tracked_run::{TrackedRunOutcome, TrackedRunService};
pub use tracker::{ModificationTracker, TrackerConfig};
