// Local filesystem FileProbe
// Follows symlink chains (with cycle detection) and reads regular files whole

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use shelldiff_core::domain::{
    human_readable_size, AccessError, FileKind, FileMetadata, FileObservation, FileStat,
};
use shelldiff_core::port::FileProbe;

/// Longest symlink chain followed before giving up (Linux SYMLOOP_MAX)
const MAX_SYMLINK_DEPTH: usize = 40;

/// Reads tracked files from the local filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileProbe;

impl LocalFileProbe {
    pub fn new() -> Self {
        Self
    }

    /// Stat the path and every symlink destination after it
    ///
    /// Returns `Ok(None)` when any link of the chain does not exist
    /// (a dangling symlink counts as absent).
    fn stat_chain(&self, path: &Path) -> Result<Option<Vec<FileStat>>, AccessError> {
        let mut current = absolute(path);
        let mut seen: Vec<PathBuf> = Vec::new();
        let mut chain = Vec::new();

        loop {
            let meta = match fs::symlink_metadata(&current) {
                Ok(meta) => meta,
                Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
                Err(e) => return Err(access_error(path, &e)),
            };

            let stat = describe(&current, &meta);
            let is_link = stat.file_type == FileKind::Symlink;
            chain.push(stat);
            seen.push(current.clone());

            if !is_link {
                return Ok(Some(chain));
            }

            let destination = fs::read_link(&current).map_err(|e| access_error(path, &e))?;
            // Relative targets resolve from the link's real directory, so a
            // `..` after a symlinked parent lands where the kernel would go.
            let next = if destination.is_absolute() {
                normalize(&destination)
            } else {
                let parent = current.parent().unwrap_or_else(|| Path::new("/"));
                let parent = fs::canonicalize(parent).unwrap_or_else(|_| parent.to_path_buf());
                normalize(&parent.join(destination))
            };

            if seen.contains(&next) || seen.len() >= MAX_SYMLINK_DEPTH {
                let mut links: Vec<String> = seen.iter().map(|p| p.display().to_string()).collect();
                links.push(next.display().to_string());
                return Err(AccessError::SymlinkCycle {
                    path: path.display().to_string(),
                    chain: links,
                });
            }
            current = next;
        }
    }
}

impl FileProbe for LocalFileProbe {
    fn observe(&self, path: &Path) -> Result<FileObservation, AccessError> {
        let chain = match self.stat_chain(path)? {
            Some(chain) => chain,
            None => {
                debug!(path = %path.display(), "No file at path");
                return Ok(FileObservation::Absent);
            }
        };

        let target_type = chain
            .last()
            .map(|stat| stat.file_type)
            .unwrap_or(FileKind::Unknown);
        if target_type != FileKind::Regular {
            return Err(AccessError::NotRegularFile {
                path: path.display().to_string(),
                file_type: target_type.to_string(),
            });
        }

        match fs::read(path) {
            Ok(content) => Ok(FileObservation::Present {
                content,
                metadata: FileMetadata::new(chain),
            }),
            // Removed between stat and read
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(FileObservation::Absent),
            Err(e) => Err(access_error(path, &e)),
        }
    }
}

fn access_error(path: &Path, error: &std::io::Error) -> AccessError {
    let path = path.display().to_string();
    match error.kind() {
        ErrorKind::PermissionDenied => AccessError::PermissionDenied { path },
        _ => AccessError::Io {
            path,
            reason: error.to_string(),
        },
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return normalize(path);
    }
    match std::env::current_dir() {
        Ok(cwd) => normalize(&cwd.join(path)),
        Err(_) => path.to_path_buf(),
    }
}

/// Lexical normalization: drops `.` and folds `..` (like `os.path.abspath`)
///
/// Symlinked directories inside `path` itself are not resolved.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(unix)]
fn describe(path: &Path, meta: &fs::Metadata) -> FileStat {
    use std::os::unix::fs::{FileTypeExt, MetadataExt};

    let ft = meta.file_type();
    let file_type = if ft.is_symlink() {
        FileKind::Symlink
    } else if ft.is_file() {
        FileKind::Regular
    } else if ft.is_dir() {
        FileKind::Directory
    } else if ft.is_char_device() {
        FileKind::CharDevice
    } else if ft.is_block_device() {
        FileKind::BlockDevice
    } else if ft.is_fifo() {
        FileKind::Fifo
    } else if ft.is_socket() {
        FileKind::Socket
    } else {
        FileKind::Unknown
    };

    FileStat {
        path: path.display().to_string(),
        owner: owner_name(meta.uid()),
        group: group_name(meta.gid()),
        file_type,
        mode: filemode(meta.mode(), file_type),
        size: human_readable_size(meta.size()),
    }
}

#[cfg(not(unix))]
fn describe(path: &Path, meta: &fs::Metadata) -> FileStat {
    let ft = meta.file_type();
    let file_type = if ft.is_symlink() {
        FileKind::Symlink
    } else if ft.is_file() {
        FileKind::Regular
    } else if ft.is_dir() {
        FileKind::Directory
    } else {
        FileKind::Unknown
    };
    let mode = if meta.permissions().readonly() {
        "r--r--r--"
    } else {
        "rw-rw-rw-"
    };

    FileStat {
        path: path.display().to_string(),
        owner: String::new(),
        group: String::new(),
        file_type,
        mode: format!("{}{}", type_char(file_type), mode),
        size: human_readable_size(meta.len()),
    }
}

#[cfg(unix)]
fn owner_name(uid: u32) -> String {
    use nix::unistd::{Uid, User};

    User::from_uid(Uid::from_raw(uid))
        .ok()
        .flatten()
        .map(|user| user.name)
        .unwrap_or_else(|| uid.to_string())
}

#[cfg(unix)]
fn group_name(gid: u32) -> String {
    use nix::unistd::{Gid, Group};

    Group::from_gid(Gid::from_raw(gid))
        .ok()
        .flatten()
        .map(|group| group.name)
        .unwrap_or_else(|| gid.to_string())
}

fn type_char(kind: FileKind) -> char {
    match kind {
        FileKind::Regular => '-',
        FileKind::Directory => 'd',
        FileKind::CharDevice => 'c',
        FileKind::BlockDevice => 'b',
        FileKind::Fifo => 'p',
        FileKind::Symlink => 'l',
        FileKind::Socket => 's',
        FileKind::Unknown => '?',
    }
}

/// `ls -l` style mode string, e.g. `-rwxr-sr-x`
#[cfg_attr(not(unix), allow(dead_code))]
fn filemode(mode: u32, kind: FileKind) -> String {
    let mut out = String::with_capacity(10);
    out.push(type_char(kind));

    for (shift, special_bit, special_char) in [(6, 0o4000, 's'), (3, 0o2000, 's'), (0, 0o1000, 't')] {
        let bits = (mode >> shift) & 0o7;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        let exec = bits & 0o1 != 0;
        let special = mode & special_bit != 0;
        out.push(match (exec, special) {
            (true, true) => special_char,
            (false, true) => special_char.to_ascii_uppercase(),
            (true, false) => 'x',
            (false, false) => '-',
        });
    }
    out
}
