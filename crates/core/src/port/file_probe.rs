// File Probe Port
// Abstraction over reading a tracked file's content and stat chain

use crate::domain::{AccessError, FileObservation};
use std::path::Path;

/// Existence-tolerant file reader used by the modification tracker
///
/// Implementations:
/// - LocalFileProbe: real filesystem (infra-system)
/// - MemoryFileProbe: in-memory map (tests)
pub trait FileProbe: Send + Sync {
    /// Observe a path
    ///
    /// # Returns
    /// - `FileObservation::Absent` if nothing exists at the path
    /// - `FileObservation::Present` with full content for a readable regular
    ///   file (symlinks are followed)
    ///
    /// # Errors
    /// - AccessError::PermissionDenied if the file exists but cannot be opened
    /// - AccessError::NotRegularFile for directories, devices, sockets, FIFOs
    /// - AccessError::SymlinkCycle if the symlink chain loops
    fn observe(&self, path: &Path) -> Result<FileObservation, AccessError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::{FileKind, FileMetadata, FileStat};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone)]
    enum Entry {
        File { content: Vec<u8>, mode: String },
        Denied,
        Directory,
    }

    /// In-memory FileProbe; clones share the same backing map
    #[derive(Clone, Default)]
    pub struct MemoryFileProbe {
        entries: Arc<Mutex<HashMap<PathBuf, Entry>>>,
        observe_count: Arc<Mutex<usize>>,
    }

    impl MemoryFileProbe {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn write(&self, path: impl Into<PathBuf>, content: impl AsRef<[u8]>) {
            self.entries.lock().unwrap().insert(
                path.into(),
                Entry::File {
                    content: content.as_ref().to_vec(),
                    mode: "-rw-r--r--".to_string(),
                },
            );
        }

        pub fn chmod(&self, path: impl Into<PathBuf>, mode: impl Into<String>) {
            let path: PathBuf = path.into();
            if let Some(Entry::File { mode: m, .. }) = self.entries.lock().unwrap().get_mut(&path) {
                *m = mode.into();
            }
        }

        pub fn remove(&self, path: impl Into<PathBuf>) {
            let path: PathBuf = path.into();
            self.entries.lock().unwrap().remove(&path);
        }

        pub fn deny(&self, path: impl Into<PathBuf>) {
            self.entries.lock().unwrap().insert(path.into(), Entry::Denied);
        }

        pub fn mkdir(&self, path: impl Into<PathBuf>) {
            self.entries
                .lock()
                .unwrap()
                .insert(path.into(), Entry::Directory);
        }

        pub fn observe_count(&self) -> usize {
            *self.observe_count.lock().unwrap()
        }
    }

    impl FileProbe for MemoryFileProbe {
        fn observe(&self, path: &Path) -> Result<FileObservation, AccessError> {
            *self.observe_count.lock().unwrap() += 1;

            let display = path.to_string_lossy().to_string();
            match self.entries.lock().unwrap().get(path).cloned() {
                None => Ok(FileObservation::Absent),
                Some(Entry::Denied) => Err(AccessError::PermissionDenied { path: display }),
                Some(Entry::Directory) => Err(AccessError::NotRegularFile {
                    path: display,
                    file_type: FileKind::Directory.to_string(),
                }),
                Some(Entry::File { content, mode }) => {
                    let metadata = FileMetadata::new(vec![FileStat {
                        path: display,
                        owner: "root".to_string(),
                        group: "root".to_string(),
                        file_type: FileKind::Regular,
                        mode,
                        size: crate::domain::human_readable_size(content.len() as u64),
                    }]);
                    Ok(FileObservation::Present { content, metadata })
                }
            }
        }
    }
}
