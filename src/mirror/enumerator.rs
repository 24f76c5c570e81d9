//! Flattens remote trees into a queue of file descriptors
//!
//! Traversal is depth-first pre-order over an explicit stack. Directories are
//! walked but never yielded. A root that cannot be stat'ed or a directory
//! that cannot be listed is logged and skipped; the rest of the tree is
//! still visited.

use std::collections::VecDeque;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use ferry_core_interface::{join_remote, RemoteFs};

use super::descriptor::FileDescriptor;
use crate::error::{FerryError, Result};
use crate::pipeline::ItemReader;

enum Frame {
    /// Configured root, kind unknown until stat'ed
    Root(String),
    Dir(String),
    File { path: String, size: u64 },
}

pub struct RemoteTreeEnumerator<R> {
    remote: R,
    roots: Vec<String>,
    local_base: PathBuf,
    queue: Option<VecDeque<FileDescriptor>>,
    failures: u64,
}

impl<R: RemoteFs> RemoteTreeEnumerator<R> {
    pub fn new(remote: R, roots: Vec<String>, local_base: impl Into<PathBuf>) -> Self {
        Self {
            remote,
            roots,
            local_base: local_base.into(),
            queue: None,
            failures: 0,
        }
    }

    /// Roots or directories skipped because the remote side refused them
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Walk every root and return the descriptors in traversal order
    pub fn enumerate(&mut self) -> Vec<FileDescriptor> {
        let mut found = Vec::new();
        let mut stack: Vec<Frame> = self.roots.iter().rev().cloned().map(Frame::Root).collect();

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Root(path) => match self.remote.stat(&path) {
                    Ok(meta) if meta.is_dir => stack.push(Frame::Dir(path)),
                    Ok(meta) => found.push(FileDescriptor::file(path, meta.size, &self.local_base)),
                    Err(e) => {
                        self.failures += 1;
                        let err = FerryError::from(e);
                        warn!(
                            path = %path,
                            category = %err.category(),
                            "Skipping unreadable root: {}",
                            err
                        );
                    }
                },
                Frame::Dir(path) => match self.remote.list_dir(&path) {
                    Ok(entries) => {
                        debug!(path = %path, entries = entries.len(), "Listed remote directory");
                        let children: Vec<Frame> = entries
                            .into_iter()
                            .filter(|entry| !entry.is_pseudo())
                            .map(|entry| {
                                let child = join_remote(&path, &entry.name);
                                if entry.is_dir {
                                    Frame::Dir(child)
                                } else {
                                    Frame::File {
                                        path: child,
                                        size: entry.size,
                                    }
                                }
                            })
                            .collect();
                        stack.extend(children.into_iter().rev());
                    }
                    Err(e) => {
                        self.failures += 1;
                        let err = FerryError::from(e);
                        warn!(
                            path = %path,
                            category = %err.category(),
                            "Skipping unlistable directory: {}",
                            err
                        );
                    }
                },
                Frame::File { path, size } => {
                    found.push(FileDescriptor::file(path, size, &self.local_base));
                }
            }
        }

        found
    }
}

impl<R: RemoteFs> ItemReader<FileDescriptor> for RemoteTreeEnumerator<R> {
    fn read(&mut self) -> Result<Option<FileDescriptor>> {
        if self.queue.is_none() {
            let found = self.enumerate();
            info!(
                roots = self.roots.len(),
                files = found.len(),
                failures = self.failures,
                "Remote tree enumerated"
            );
            self.queue = Some(found.into());
        }
        Ok(self.queue.as_mut().and_then(VecDeque::pop_front))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core_interface::MemoryRemote;

    fn remote_paths(descriptors: &[FileDescriptor]) -> Vec<&str> {
        descriptors.iter().map(|d| d.remote_path.as_str()).collect()
    }

    #[test]
    fn test_pre_order_without_directories() {
        let remote = MemoryRemote::new();
        remote.add_file("/root/a.txt", b"a");
        remote.add_file("/root/sub/b.txt", b"bb");
        remote.add_file("/root/sub/c.txt", b"ccc");

        let mut enumerator = RemoteTreeEnumerator::new(&remote, vec!["/root".to_string()], "base");
        let found = enumerator.enumerate();

        assert_eq!(
            remote_paths(&found),
            vec!["/root/a.txt", "/root/sub/b.txt", "/root/sub/c.txt"]
        );
        assert!(found.iter().all(|d| !d.is_directory));
        assert_eq!(found[2].size, 3);
        assert_eq!(found[2].local_path, PathBuf::from("base/root/sub/c.txt"));
    }

    #[test]
    fn test_subdirectory_visited_before_next_sibling() {
        let remote = MemoryRemote::new();
        remote.add_file("/r/a.txt", b"");
        remote.add_file("/r/m/inner.txt", b"");
        remote.add_file("/r/z.txt", b"");

        let found = RemoteTreeEnumerator::new(&remote, vec!["/r".to_string()], "b").enumerate();
        assert_eq!(
            remote_paths(&found),
            vec!["/r/a.txt", "/r/m/inner.txt", "/r/z.txt"]
        );
    }

    #[test]
    fn test_file_root_and_root_order() {
        let remote = MemoryRemote::new();
        remote.add_file("/one/x.txt", b"x");
        remote.add_file("/single.cfg", b"cfg");

        let roots = vec!["/single.cfg".to_string(), "/one/".to_string()];
        let found = RemoteTreeEnumerator::new(&remote, roots, "b").enumerate();
        assert_eq!(remote_paths(&found), vec!["/single.cfg", "/one/x.txt"]);
    }

    #[test]
    fn test_failures_are_skipped() {
        let remote = MemoryRemote::new();
        remote.add_file("/ok/a.txt", b"a");
        remote.add_file("/ok/locked/hidden.txt", b"h");
        remote.add_file("/ok/z.txt", b"z");
        remote.fail_on("/ok/locked");

        let roots = vec!["/missing".to_string(), "/ok".to_string()];
        let mut enumerator = RemoteTreeEnumerator::new(&remote, roots, "b");
        let found = enumerator.enumerate();

        assert_eq!(remote_paths(&found), vec!["/ok/a.txt", "/ok/z.txt"]);
        assert_eq!(enumerator.failures(), 2);
    }

    #[test]
    fn test_read_materializes_once() {
        let remote = MemoryRemote::new();
        remote.add_file("/d/1.txt", b"1");
        remote.add_file("/d/2.txt", b"2");

        let mut enumerator = RemoteTreeEnumerator::new(&remote, vec!["/d".to_string()], "b");
        let first = enumerator.read().unwrap().unwrap();
        assert_eq!(first.remote_path, "/d/1.txt");

        // Files added after the first read are not picked up
        remote.add_file("/d/3.txt", b"3");
        assert_eq!(enumerator.read().unwrap().unwrap().remote_path, "/d/2.txt");
        assert!(enumerator.read().unwrap().is_none());
        assert!(enumerator.read().unwrap().is_none());
    }

    #[test]
    fn test_empty_roots() {
        let remote = MemoryRemote::new();
        let mut enumerator = RemoteTreeEnumerator::new(&remote, Vec::new(), "b");
        assert!(enumerator.read().unwrap().is_none());
    }
}
