//! Remote file descriptors and local path mapping

use serde::Serialize;
use std::path::{Component, Path, PathBuf};

/// One remote file and where it lands locally
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDescriptor {
    pub remote_path: String,
    pub local_path: PathBuf,
    pub is_directory: bool,
    pub size: u64,
}

impl FileDescriptor {
    /// Descriptor for a regular remote file re-based under `base`
    pub fn file(remote_path: impl Into<String>, size: u64, base: &Path) -> Self {
        let remote_path = remote_path.into();
        let local_path = local_path_for(base, &remote_path);
        Self {
            remote_path,
            local_path,
            is_directory: false,
            size,
        }
    }
}

/// Map a remote path to a local path under `base`
///
/// The leading `/` is stripped and the rest joined under `base`. Root, `.`
/// and `..` components are dropped, so the result never leaves `base`.
pub fn local_path_for(base: &Path, remote_path: &str) -> PathBuf {
    let mut local = base.to_path_buf();
    for component in Path::new(remote_path.trim_start_matches('/')).components() {
        if let Component::Normal(part) = component {
            local.push(part);
        }
    }
    local
}
