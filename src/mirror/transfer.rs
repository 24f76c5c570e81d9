//! Per-file transfer: local directory preparation and byte copy

use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use tracing::{debug, warn};

use ferry_core_interface::RemoteFs;

use super::descriptor::FileDescriptor;
use crate::error::{FerryError, Result};
use crate::pipeline::{Chunk, ItemProcessor, ItemWriter, Processed};

/// Counters kept by [`RemoteFileTransferWriter`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TransferStats {
    pub files_transferred: u64,
    pub files_failed: u64,
    pub bytes_transferred: u64,
}

/// Creates the local parent directory of each descriptor
///
/// Never skips. Failing to create a directory fails the run, since every
/// later file under it would fail the same way.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnsureLocalParent;

impl ItemProcessor<FileDescriptor, FileDescriptor> for EnsureLocalParent {
    fn process(&mut self, item: FileDescriptor) -> Result<Processed<FileDescriptor>> {
        if let Some(parent) = item.local_path.parent() {
            fs::create_dir_all(parent).map_err(|source| FerryError::Sink {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        Ok(Processed::Accept(item))
    }
}

/// Streams each remote file of a chunk to its local path
///
/// A file that fails is logged, its partial local copy removed, and the
/// remaining files of the chunk are still attempted. The writer itself never
/// fails the step.
pub struct RemoteFileTransferWriter<'s, R> {
    remote: R,
    stats: &'s mut TransferStats,
}

impl<'s, R: RemoteFs> RemoteFileTransferWriter<'s, R> {
    pub fn new(remote: R, stats: &'s mut TransferStats) -> Self {
        Self { remote, stats }
    }

    fn transfer(&self, descriptor: &FileDescriptor) -> Result<u64> {
        let transfer_error = |message: String| FerryError::Transfer {
            remote_path: descriptor.remote_path.clone(),
            message,
        };

        let mut source = self
            .remote
            .open_read(&descriptor.remote_path)
            .map_err(|e| transfer_error(e.to_string()))?;
        let file = File::create(&descriptor.local_path).map_err(|e| {
            transfer_error(format!("cannot create {}: {}", descriptor.local_path.display(), e))
        })?;

        let mut dest = BufWriter::new(file);
        let copied = io::copy(&mut source, &mut dest)
            .and_then(|n| dest.flush().map(|_| n))
            .map_err(|e| transfer_error(e.to_string()));

        if copied.is_err() {
            drop(dest);
            let _ = fs::remove_file(&descriptor.local_path);
        }
        copied
    }
}

impl<R: RemoteFs> ItemWriter<FileDescriptor> for RemoteFileTransferWriter<'_, R> {
    fn write(&mut self, chunk: Chunk<FileDescriptor>) -> Result<()> {
        for descriptor in chunk {
            match self.transfer(&descriptor) {
                Ok(bytes) => {
                    self.stats.files_transferred += 1;
                    self.stats.bytes_transferred += bytes;
                    debug!(
                        remote = %descriptor.remote_path,
                        local = %descriptor.local_path.display(),
                        bytes,
                        "File transferred"
                    );
                }
                Err(e) => {
                    self.stats.files_failed += 1;
                    warn!(
                        remote = %descriptor.remote_path,
                        local = %descriptor.local_path.display(),
                        "Skipping file: {}",
                        e
                    );
                }
            }
        }
        Ok(())
    }
}
