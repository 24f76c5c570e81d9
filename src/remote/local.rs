//! Local filesystem implementation of the remote capability
//!
//! Serves a locally mounted tree (NFS, SSHFS, a synced folder) as if it were
//! a remote session. Remote paths are resolved under `root`; `..` components
//! are dropped so no request can leave it.
//!
//! Listings report a link to a file as that file. Links to directories are
//! left out, so a link back to an ancestor cannot make the walk revisit it.
//! An entry that cannot be read is logged and left out of the listing.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

use ferry_core_interface::{RemoteEntry, RemoteFs, RemoteFsError, RemoteMetadata, Result};

#[derive(Debug, Clone)]
pub struct LocalRemote {
    root: PathBuf,
}

impl LocalRemote {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let mut resolved = self.root.clone();
        for component in Path::new(path.trim_start_matches('/')).components() {
            if let Component::Normal(part) = component {
                resolved.push(part);
            }
        }
        resolved
    }
}

fn map_io(path: &str, err: io::Error) -> RemoteFsError {
    match err.kind() {
        io::ErrorKind::NotFound => RemoteFsError::NotFound(path.to_string()),
        io::ErrorKind::PermissionDenied => RemoteFsError::PermissionDenied(path.to_string()),
        _ => RemoteFsError::Io(err),
    }
}

fn to_metadata(meta: &fs::Metadata) -> RemoteMetadata {
    if meta.is_dir() {
        RemoteMetadata::directory()
    } else {
        RemoteMetadata::file(meta.len())
    }
}

/// Metadata of one listed entry, `None` for a link to a directory
fn entry_metadata(entry: &fs::DirEntry) -> io::Result<Option<RemoteMetadata>> {
    if !entry.file_type()?.is_symlink() {
        return Ok(Some(to_metadata(&entry.metadata()?)));
    }
    let target = fs::metadata(entry.path())?;
    if target.is_dir() {
        Ok(None)
    } else {
        Ok(Some(to_metadata(&target)))
    }
}

impl RemoteFs for LocalRemote {
    fn stat(&self, path: &str) -> Result<RemoteMetadata> {
        let meta = fs::metadata(self.resolve(path)).map_err(|e| map_io(path, e))?;
        Ok(to_metadata(&meta))
    }

    fn list_dir(&self, path: &str) -> Result<Vec<RemoteEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(self.resolve(path)).map_err(|e| map_io(path, e))? {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!(dir = %path, error = %e, "Skipping unreadable directory entry");
                    continue;
                }
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            match entry_metadata(&entry) {
                Ok(Some(metadata)) => entries.push(RemoteEntry::new(name, metadata)),
                Ok(None) => {
                    debug!(dir = %path, entry = %name, "Not following directory link");
                }
                Err(e) => {
                    warn!(dir = %path, entry = %name, error = %e, "Skipping unreadable entry");
                }
            }
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn open_read(&self, path: &str) -> Result<Box<dyn Read + '_>> {
        let resolved = self.resolve(path);
        if resolved.is_dir() {
            return Err(RemoteFsError::Protocol {
                path: path.to_string(),
                message: "is a directory".to_string(),
            });
        }
        let file = File::open(resolved).map_err(|e| map_io(path, e))?;
        Ok(Box::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> (tempfile::TempDir, LocalRemote) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("data/sub")).unwrap();
        fs::write(dir.path().join("data/b.txt"), b"bee").unwrap();
        fs::write(dir.path().join("data/a.txt"), b"a").unwrap();
        fs::write(dir.path().join("data/sub/c.txt"), b"sea").unwrap();
        let remote = LocalRemote::new(dir.path());
        (dir, remote)
    }

    #[test]
    fn test_stat() {
        let (_dir, remote) = tree();
        assert!(remote.stat("/data").unwrap().is_dir);
        assert_eq!(remote.stat("/data/b.txt").unwrap(), RemoteMetadata::file(3));
        assert!(matches!(
            remote.stat("/data/none"),
            Err(RemoteFsError::NotFound(_))
        ));
    }

    #[test]
    fn test_listing_is_sorted() {
        let (_dir, remote) = tree();
        let names: Vec<_> = remote
            .list_dir("/data")
            .unwrap()
            .into_iter()
            .map(|e| (e.name, e.is_dir))
            .collect();
        assert_eq!(
            names,
            vec![
                ("a.txt".to_string(), false),
                ("b.txt".to_string(), false),
                ("sub".to_string(), true),
            ]
        );
    }

    #[test]
    fn test_open_read() {
        let (_dir, remote) = tree();
        let mut body = String::new();
        remote
            .open_read("/data/sub/c.txt")
            .unwrap()
            .read_to_string(&mut body)
            .unwrap();
        assert_eq!(body, "sea");
        assert!(remote.open_read("/data").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_broken_link_does_not_hide_siblings() {
        let (dir, remote) = tree();
        std::os::unix::fs::symlink(dir.path().join("nowhere"), dir.path().join("data/m-broken"))
            .unwrap();

        let names: Vec<_> = remote
            .list_dir("/data")
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "sub"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_links_to_files_listed_links_to_dirs_not() {
        let (dir, remote) = tree();
        std::os::unix::fs::symlink(dir.path().join("data/b.txt"), dir.path().join("data/c-link"))
            .unwrap();
        std::os::unix::fs::symlink(dir.path().join("data"), dir.path().join("data/loop")).unwrap();

        let names: Vec<_> = remote
            .list_dir("/data")
            .unwrap()
            .into_iter()
            .map(|e| (e.name, e.size))
            .collect();
        assert_eq!(
            names,
            vec![
                ("a.txt".to_string(), 1),
                ("b.txt".to_string(), 3),
                ("c-link".to_string(), 3),
                ("sub".to_string(), 0),
            ]
        );
    }

    #[test]
    fn test_parent_components_stay_under_root() {
        let (dir, remote) = tree();
        assert_eq!(remote.resolve("/../../data/a.txt"), dir.path().join("data/a.txt"));
        assert!(remote.stat("/../data/a.txt").is_ok());
    }
}
