// Domain Layer - Pure tracking model and entities

pub mod command;
pub mod error;
pub mod file;
pub mod tracking;

// Re-exports
pub use command::{CommandRequest, ModuleArgs};
pub use error::{AccessError, InputError};
pub use file::{human_readable_size, FileKind, FileMetadata, FileObservation, FileStat};
pub use tracking::{
    ContentState, DiffRecord, Snapshot, SnapshotState, TrackedFile, TrackedPaths, TrackingPhase,
    TrackingResult, TrackingWarning, Transition,
};
