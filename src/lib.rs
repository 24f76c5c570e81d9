/*!
 * batchferry - chunked batch jobs
 *
 * Two jobs share one read/process/write engine:
 * - Log-to-CSV extraction of request records, grouped by token
 * - Mirroring of remote directory trees into a local base directory,
 *   once or on a fixed interval
 *
 * Remote access goes through the `ferry-core-interface` capability, served
 * by a local tree or an SFTP session (feature `ssh-backend`).
 */

pub mod config;
pub mod error;
pub mod job;
pub mod launcher;
pub mod logging;
pub mod logs;
pub mod mirror;
pub mod pipeline;
pub mod remote;

// Re-export commonly used types
pub use config::{BatchConfig, FerryConfig, LogLevel, MirrorBackend, MirrorConfig};
pub use error::{FerryError, Result};
pub use job::{JobExecution, JobParameters, JobStatus};
pub use launcher::{mirror_once, process_all_files, process_file, schedule_mirror};
pub use logs::{run_log_job, LogRecord};
pub use mirror::{run_mirror, FileDescriptor, MirrorOutcome, TransferStats};
pub use pipeline::{Chunk, ChunkStep, Processed, StepStats};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(VERSION, env!("CARGO_PKG_VERSION"));
    }
}
