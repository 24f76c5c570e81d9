/*!
 * Remote tree mirror job
 *
 * Enumerates the configured remote roots into file descriptors, prepares
 * the local directories, and streams every file under the local base
 * directory. The session is borrowed for the whole run; opening and closing
 * it is the caller's business.
 */

pub mod descriptor;
pub mod enumerator;
pub mod scheduler;
pub mod transfer;

pub use descriptor::{local_path_for, FileDescriptor};
pub use enumerator::RemoteTreeEnumerator;
pub use scheduler::{next_deadline, MirrorScheduler, ScheduleSummary};
pub use transfer::{EnsureLocalParent, RemoteFileTransferWriter, TransferStats};

use serde::Serialize;
use tracing::info;

use ferry_core_interface::RemoteFs;

use crate::config::MirrorConfig;
use crate::job::{self, JobExecution, JobParameters};
use crate::pipeline::{ChunkStep, StepStats};

/// Job name used in logs and executions
pub const MIRROR_JOB_NAME: &str = "sftpMirrorJob";

/// Outcome of one mirror run
#[derive(Debug, Clone, Serialize)]
pub struct MirrorOutcome {
    pub execution: JobExecution,
    pub transfer: TransferStats,
}

impl MirrorOutcome {
    /// The run succeeded and no single file failed
    pub fn is_clean(&self) -> bool {
        self.execution.is_success() && self.transfer.files_failed == 0
    }
}

/// Run the mirror job once over an already open session
pub fn run_mirror<R: RemoteFs>(
    remote: &R,
    settings: &MirrorConfig,
    parameters: JobParameters,
) -> MirrorOutcome {
    let mut transfer = TransferStats::default();

    let execution = job::execute(MIRROR_JOB_NAME, parameters, |_| {
        let reader = RemoteTreeEnumerator::new(
            remote,
            settings.targets.clone(),
            settings.local_base_dir.clone(),
        );
        let writer = RemoteFileTransferWriter::new(remote, &mut transfer);
        match ChunkStep::new(
            "sftpMirrorStep",
            reader,
            EnsureLocalParent,
            writer,
            settings.chunk_size,
        ) {
            Ok(step) => step.run_with_stats(),
            Err(e) => (StepStats::default(), Err(e)),
        }
    });

    info!(
        transferred = transfer.files_transferred,
        failed = transfer.files_failed,
        bytes = transfer.bytes_transferred,
        "Mirror transfer totals"
    );
    MirrorOutcome {
        execution,
        transfer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobStatus;
    use ferry_core_interface::MemoryRemote;
    use std::fs;

    #[test]
    fn test_run_mirror_copies_tree() {
        let dir = tempfile::tempdir().unwrap();
        let remote = MemoryRemote::new();
        remote.add_file("/export/a.log", b"alpha");
        remote.add_file("/export/nested/b.log", b"beta");

        let settings = MirrorConfig {
            targets: vec!["/export".to_string()],
            local_base_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let outcome = run_mirror(&remote, &settings, JobParameters::for_tick());

        assert!(outcome.is_clean());
        assert_eq!(outcome.execution.stats.items_written, 2);
        assert_eq!(outcome.transfer.bytes_transferred, 9);
        assert_eq!(
            fs::read_to_string(dir.path().join("export/nested/b.log")).unwrap(),
            "beta"
        );
    }

    #[test]
    fn test_failed_file_keeps_run_successful() {
        let dir = tempfile::tempdir().unwrap();
        let remote = MemoryRemote::new();
        remote.add_file("/x/ok.txt", b"ok");
        remote.add_file("/x/bad.txt", b"bad");
        remote.fail_on("/x/bad.txt");

        let settings = MirrorConfig {
            targets: vec!["/x".to_string()],
            local_base_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let outcome = run_mirror(&remote, &settings, JobParameters::for_tick());

        assert_eq!(outcome.execution.status, JobStatus::Succeeded);
        assert_eq!(outcome.transfer.files_failed, 1);
        assert!(!outcome.is_clean());
        assert!(dir.path().join("x/ok.txt").is_file());
    }
}
