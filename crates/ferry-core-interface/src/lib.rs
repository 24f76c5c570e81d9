//! Ferry Core Interface: Remote Filesystem Capability
//!
//! This crate defines the `RemoteFs` trait, the narrow capability the batchferry
//! mirror pipeline needs from a file-transfer session:
//!
//! 1. **Discovery**: stat a path, list a directory
//! 2. **Data Access**: open a readable byte stream for a path
//!
//! Session establishment, authentication and wire protocol details belong to
//! the implementor. The pipeline only ever borrows an already-open session.
//!
//! # Example
//!
//! ```rust
//! use ferry_core_interface::{MemoryRemote, RemoteFs};
//! use std::io::Read;
//!
//! let remote = MemoryRemote::new();
//! remote.add_file("/data/report.txt", b"hello");
//!
//! let meta = remote.stat("/data/report.txt").unwrap();
//! assert_eq!(meta.size, 5);
//!
//! let mut body = String::new();
//! remote.open_read("/data/report.txt").unwrap().read_to_string(&mut body).unwrap();
//! assert_eq!(body, "hello");
//! ```

use std::io::Read;
use thiserror::Error;

mod memory;

pub use memory::MemoryRemote;

#[derive(Error, Debug)]
pub enum RemoteFsError {
    #[error("Remote path not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol error on {path}: {message}")]
    Protocol { path: String, message: String },
}

pub type Result<T> = std::result::Result<T, RemoteFsError>;

/// Attributes returned by `stat`
///
/// Kept minimal so that SFTP, local and in-memory implementations can all
/// answer it without extra round-trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteMetadata {
    /// Whether the path is a directory
    pub is_dir: bool,

    /// Size in bytes (0 for directories)
    pub size: u64,
}

impl RemoteMetadata {
    /// Metadata for a regular file
    pub fn file(size: u64) -> Self {
        Self {
            is_dir: false,
            size,
        }
    }

    /// Metadata for a directory
    pub fn directory() -> Self {
        Self {
            is_dir: true,
            size: 0,
        }
    }
}

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Entry name relative to the listed directory (no separators)
    pub name: String,

    /// Whether the entry is a directory
    pub is_dir: bool,

    /// Size in bytes (0 for directories)
    pub size: u64,
}

impl RemoteEntry {
    pub fn new(name: impl Into<String>, metadata: RemoteMetadata) -> Self {
        Self {
            name: name.into(),
            is_dir: metadata.is_dir,
            size: metadata.size,
        }
    }

    /// True for the `.` and `..` pseudo-entries some servers return
    pub fn is_pseudo(&self) -> bool {
        self.name == "." || self.name == ".."
    }
}

/// The remote capability consumed by the mirror pipeline
///
/// Implementations:
/// - **SftpSession**: SSH/SFTP session (batchferry, `ssh-backend` feature)
/// - **LocalRemote**: a locally mounted tree (batchferry)
/// - **MemoryRemote**: in-memory tree for tests (this crate)
///
/// All operations are blocking. Paths are `/`-separated strings as the remote
/// side understands them, never converted through the local `Path` type.
pub trait RemoteFs {
    /// Get attributes for a file or directory
    ///
    /// # Errors
    ///
    /// Returns `RemoteFsError::NotFound` if the path doesn't exist.
    fn stat(&self, path: &str) -> Result<RemoteMetadata>;

    /// List directory contents (non-recursive), in the order the remote
    /// side returns them
    ///
    /// Implementations may include the `.` and `..` pseudo-entries; callers
    /// are expected to skip them with [`RemoteEntry::is_pseudo`].
    fn list_dir(&self, path: &str) -> Result<Vec<RemoteEntry>>;

    /// Open a file for streaming reads
    fn open_read(&self, path: &str) -> Result<Box<dyn Read + '_>>;
}

impl<T: RemoteFs + ?Sized> RemoteFs for &T {
    fn stat(&self, path: &str) -> Result<RemoteMetadata> {
        (**self).stat(path)
    }

    fn list_dir(&self, path: &str) -> Result<Vec<RemoteEntry>> {
        (**self).list_dir(path)
    }

    fn open_read(&self, path: &str) -> Result<Box<dyn Read + '_>> {
        (**self).open_read(path)
    }
}

/// Join a remote directory and an entry name with a single `/`
pub fn join_remote(dir: &str, name: &str) -> String {
    let trimmed = dir.trim_end_matches('/');
    format!("{}/{}", trimmed, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_remote() {
        assert_eq!(join_remote("/remote/logs", "a.log"), "/remote/logs/a.log");
        assert_eq!(join_remote("/remote/logs/", "a.log"), "/remote/logs/a.log");
        assert_eq!(join_remote("/", "etc"), "/etc");
        assert_eq!(join_remote("relative", "x"), "relative/x");
    }

    #[test]
    fn test_pseudo_entries() {
        assert!(RemoteEntry::new(".", RemoteMetadata::directory()).is_pseudo());
        assert!(RemoteEntry::new("..", RemoteMetadata::directory()).is_pseudo());
        assert!(!RemoteEntry::new("...", RemoteMetadata::file(0)).is_pseudo());
        assert!(!RemoteEntry::new(".hidden", RemoteMetadata::file(3)).is_pseudo());
    }

    #[test]
    fn test_error_display() {
        let err = RemoteFsError::Protocol {
            path: "/a".to_string(),
            message: "bad packet".to_string(),
        };
        assert_eq!(err.to_string(), "Protocol error on /a: bad packet");
        assert_eq!(
            RemoteFsError::NotFound("/x".to_string()).to_string(),
            "Remote path not found: /x"
        );
    }
}
