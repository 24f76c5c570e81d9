/*!
 * Job launcher
 *
 * Discovers input files and runs one log job per file, and drives the
 * mirror job once or on a schedule. Each input file is processed in turn; a
 * failed file is reported and the next one still runs.
 */

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use ferry_core_interface::RemoteFs;

use crate::config::{BatchConfig, FerryConfig, MirrorConfig};
use crate::error::{FerryError, Result};
use crate::job::{JobExecution, JobParameters};
use crate::logs::run_log_job;
use crate::mirror::{run_mirror, MirrorOutcome, MirrorScheduler, ScheduleSummary};
use crate::remote::MirrorSession;

/// Executions of one pass over the input directory
#[derive(Debug, Clone, Default, Serialize)]
pub struct OrchestrationReport {
    pub executions: Vec<JobExecution>,
}

impl OrchestrationReport {
    pub fn succeeded(&self) -> usize {
        self.executions.iter().filter(|e| e.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.executions.len() - self.succeeded()
    }

    pub fn is_empty(&self) -> bool {
        self.executions.is_empty()
    }
}

/// Accepted input files directly inside `settings.input_dir`, sorted by name
///
/// A missing input directory yields no files.
pub fn discover_input_files(settings: &BatchConfig) -> Vec<PathBuf> {
    let input_dir = &settings.input_dir;
    if !input_dir.is_dir() {
        warn!(dir = %input_dir.display(), "Input directory does not exist");
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(input_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Failed to read input entry: {}", e);
                continue;
            }
        };
        if entry.file_type().is_file() && settings.accepts(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files
}

/// Output path for one input: `<stem>.csv` under the output directory
pub fn output_path_for(input: &Path, output_dir: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    output_dir.join(format!("{}.csv", stem))
}

/// Run the log job for a single input/output pair
pub fn process_file(input: &Path, output: &Path, settings: &BatchConfig) -> JobExecution {
    run_log_job(JobParameters::for_file(input, output), settings)
}

/// Run the log job for every accepted file in the input directory
pub fn process_all_files(settings: &BatchConfig) -> Result<OrchestrationReport> {
    let files = discover_input_files(settings);
    if files.is_empty() {
        info!(dir = %settings.input_dir.display(), "No input files to process");
        return Ok(OrchestrationReport::default());
    }

    fs::create_dir_all(&settings.output_dir).map_err(|source| FerryError::Sink {
        path: settings.output_dir.clone(),
        source,
    })?;
    info!(files = files.len(), "Processing input files");

    let mut report = OrchestrationReport::default();
    for input in files {
        let output = output_path_for(&input, &settings.output_dir);
        let execution = process_file(&input, &output, settings);
        if execution.is_success() {
            info!(
                input = %input.display(),
                output = %output.display(),
                records = execution.stats.items_written,
                "File processed"
            );
        } else {
            error!(
                input = %input.display(),
                failure = execution.failure.as_deref().unwrap_or("unknown"),
                "File failed"
            );
        }
        report.executions.push(execution);
    }

    info!(
        succeeded = report.succeeded(),
        failed = report.failed(),
        "Input directory pass complete"
    );
    Ok(report)
}

/// Open a session with `open`, run the mirror job once, release the session
///
/// The session is dropped before returning on every path, including a
/// failed run.
pub fn mirror_once_with<S, F>(settings: &MirrorConfig, open: F) -> Result<MirrorOutcome>
where
    S: RemoteFs,
    F: FnOnce(&MirrorConfig) -> Result<S>,
{
    let session = open(settings)?;
    let outcome = run_mirror(&session, settings, JobParameters::for_tick());
    drop(session);
    debug!("Mirror session released");
    Ok(outcome)
}

/// One mirror run with the configured backend
///
/// Returns `Ok(None)` when the mirror job is disabled.
pub fn mirror_once(config: &FerryConfig) -> Result<Option<MirrorOutcome>> {
    if !config.mirror.enabled {
        info!("Mirror job disabled, nothing to do");
        return Ok(None);
    }
    config.validate_mirror()?;
    mirror_once_with(&config.mirror, MirrorSession::open).map(Some)
}

/// Run the mirror job every `interval_secs` until `max_runs` is reached
pub fn schedule_mirror(config: &FerryConfig, max_runs: Option<u64>) -> Result<ScheduleSummary> {
    if !config.mirror.enabled {
        info!("Mirror job disabled, scheduler not started");
        return Ok(ScheduleSummary::default());
    }
    config.validate_mirror()?;

    let scheduler = MirrorScheduler::new(Duration::from_secs(config.mirror.interval_secs))?
        .with_max_runs(max_runs);
    Ok(scheduler.run(|| {
        mirror_once_with(&config.mirror, MirrorSession::open).map(|outcome| outcome.execution)
    }))
}
