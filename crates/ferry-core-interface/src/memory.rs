//! In-memory remote filesystem
//!
//! Stores a remote tree in memory so the mirror pipeline can be exercised
//! without a live SFTP server. Listings behave like a raw SFTP `READDIR`:
//! entries are sorted by name and preceded by the `.` and `..` pseudo-entries.

use crate::{RemoteEntry, RemoteFs, RemoteFsError, RemoteMetadata, Result};
use std::collections::{BTreeMap, HashSet};
use std::io::{Cursor, Read};
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone)]
enum Node {
    File(Vec<u8>),
    Dir,
}

/// In-memory implementation of `RemoteFs`
///
/// Cloning shares the same tree, so a test can keep a handle while the
/// pipeline borrows another.
#[derive(Debug, Clone, Default)]
pub struct MemoryRemote {
    nodes: Arc<RwLock<BTreeMap<String, Node>>>,
    failing: Arc<RwLock<HashSet<String>>>,
}

impl MemoryRemote {
    /// Create a tree containing only the root directory
    pub fn new() -> Self {
        let remote = Self::default();
        remote.write_nodes().insert("/".to_string(), Node::Dir);
        remote
    }

    /// Add a file, creating missing parent directories
    pub fn add_file(&self, path: &str, data: &[u8]) {
        let path = normalize(path);
        self.add_parents(&path);
        self.write_nodes().insert(path, Node::File(data.to_vec()));
    }

    /// Add a directory, creating missing parent directories
    pub fn add_dir(&self, path: &str) {
        let path = normalize(path);
        self.add_parents(&path);
        self.write_nodes().insert(path, Node::Dir);
    }

    /// Make every operation on `path` fail with `PermissionDenied`
    pub fn fail_on(&self, path: &str) {
        self.failing
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(normalize(path));
    }

    /// Number of files currently stored
    pub fn file_count(&self) -> usize {
        self.read_nodes()
            .values()
            .filter(|n| matches!(n, Node::File(_)))
            .count()
    }

    fn add_parents(&self, path: &str) {
        let mut nodes = self.write_nodes();
        let mut current = parent_of(path);
        while let Some(dir) = current {
            nodes.entry(dir.clone()).or_insert(Node::Dir);
            current = parent_of(&dir);
        }
    }

    fn check(&self, path: &str) -> Result<()> {
        let failing = self.failing.read().unwrap_or_else(|e| e.into_inner());
        if failing.contains(path) {
            return Err(RemoteFsError::PermissionDenied(path.to_string()));
        }
        Ok(())
    }

    fn read_nodes(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, Node>> {
        self.nodes.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_nodes(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, Node>> {
        self.nodes.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl RemoteFs for MemoryRemote {
    fn stat(&self, path: &str) -> Result<RemoteMetadata> {
        let path = normalize(path);
        self.check(&path)?;
        match self.read_nodes().get(&path) {
            Some(Node::File(data)) => Ok(RemoteMetadata::file(data.len() as u64)),
            Some(Node::Dir) => Ok(RemoteMetadata::directory()),
            None => Err(RemoteFsError::NotFound(path)),
        }
    }

    fn list_dir(&self, path: &str) -> Result<Vec<RemoteEntry>> {
        let path = normalize(path);
        self.check(&path)?;
        let nodes = self.read_nodes();

        match nodes.get(&path) {
            Some(Node::Dir) => {}
            Some(Node::File(_)) => {
                return Err(RemoteFsError::Protocol {
                    path,
                    message: "not a directory".to_string(),
                })
            }
            None => return Err(RemoteFsError::NotFound(path)),
        }

        let mut entries = vec![
            RemoteEntry::new(".", RemoteMetadata::directory()),
            RemoteEntry::new("..", RemoteMetadata::directory()),
        ];

        // BTreeMap iteration keeps children sorted by full path, hence by name
        for (child, node) in nodes.iter() {
            if child == &path || parent_of(child).as_deref() != Some(path.as_str()) {
                continue;
            }
            let name = child.rsplit('/').next().unwrap_or(child.as_str());
            let metadata = match node {
                Node::File(data) => RemoteMetadata::file(data.len() as u64),
                Node::Dir => RemoteMetadata::directory(),
            };
            entries.push(RemoteEntry::new(name, metadata));
        }

        Ok(entries)
    }

    fn open_read(&self, path: &str) -> Result<Box<dyn Read + '_>> {
        let path = normalize(path);
        self.check(&path)?;
        match self.read_nodes().get(&path) {
            Some(Node::File(data)) => Ok(Box::new(Cursor::new(data.clone()))),
            Some(Node::Dir) => Err(RemoteFsError::Protocol {
                path,
                message: "is a directory".to_string(),
            }),
            None => Err(RemoteFsError::NotFound(path)),
        }
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

fn parent_of(path: &str) -> Option<String> {
    if path == "/" {
        return None;
    }
    match path.rsplit_once('/') {
        Some(("", _)) => Some("/".to_string()),
        Some((head, _)) => Some(head.to_string()),
        None => None,
    }
}
