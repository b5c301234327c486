// File observation model (what a FileProbe sees at one instant)

use serde::{Deserialize, Serialize};

/// File type as reported by lstat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Regular,
    Directory,
    CharDevice,
    BlockDevice,
    Fifo,
    Symlink,
    Socket,
    Unknown,
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileKind::Regular => write!(f, "regular file"),
            FileKind::Directory => write!(f, "directory"),
            FileKind::CharDevice => write!(f, "character device"),
            FileKind::BlockDevice => write!(f, "block device"),
            FileKind::Fifo => write!(f, "FIFO/pipe"),
            FileKind::Symlink => write!(f, "symlink"),
            FileKind::Socket => write!(f, "socket"),
            FileKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// Human-readable stat of one link in a path's symlink chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStat {
    pub path: String,
    pub owner: String,
    pub group: String,
    pub file_type: FileKind,
    pub mode: String, // e.g. "-rw-r--r--"
    pub size: String, // e.g. "12 bytes", "1.50 KiB"
}

/// Stat chain for a path: first entry is the path itself, followed by each
/// symlink destination until a non-symlink is reached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileMetadata(Vec<FileStat>);

impl FileMetadata {
    pub fn new(chain: Vec<FileStat>) -> Self {
        Self(chain)
    }

    pub fn chain(&self) -> &[FileStat] {
        &self.0
    }

    /// Final target of the chain (the path itself when not a symlink)
    pub fn target(&self) -> Option<&FileStat> {
        self.0.last()
    }
}

/// Result of probing a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileObservation {
    Absent,
    Present {
        content: Vec<u8>,
        metadata: FileMetadata,
    },
}

/// Format a byte count the way `ls -h` style tools do (binary units)
pub fn human_readable_size(size: u64) -> String {
    const SUFFIXES: [&str; 5] = ["KiB", "MiB", "GiB", "TiB", "PiB"];

    if size < 1024 {
        return format!("{} bytes", size);
    }

    let mut current = size as f64;
    let mut suffix = SUFFIXES[0];
    for candidate in SUFFIXES {
        current /= 1024.0;
        suffix = candidate;
        if current < 1024.0 {
            break;
        }
    }
    format!("{:.2} {}", current, suffix)
}
