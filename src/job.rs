/*!
 * Job parameters and execution outcomes
 *
 * A job run is identified by a flat string map of parameters and reports a
 * single `JobExecution` when it ends. Nothing here is persisted.
 */

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::error::Result;
use crate::pipeline::StepStats;

/// Input file parameter key
pub const INPUT_FILE: &str = "inputFile";

/// Output file parameter key
pub const OUTPUT_FILE: &str = "outputFile";

/// Run instance parameter key
pub const TIMESTAMP: &str = "timestamp";

const DEFAULT_INPUT_FILE: &str = "input/logs.txt";
const DEFAULT_OUTPUT_FILE: &str = "output/result.csv";

/// Flat, immutable parameter map for one job instance
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobParameters {
    values: BTreeMap<String, String>,
}

impl JobParameters {
    pub fn builder() -> JobParametersBuilder {
        JobParametersBuilder::default()
    }

    /// Parameters for one log file, stamped with the current local time
    pub fn for_file(input: &Path, output: &Path) -> Self {
        Self::builder()
            .add_string(INPUT_FILE, input.display().to_string())
            .add_string(OUTPUT_FILE, output.display().to_string())
            .add_string(TIMESTAMP, now_iso8601())
            .build()
    }

    /// Parameters for one scheduled mirror run
    pub fn for_tick() -> Self {
        Self::builder().add_string(TIMESTAMP, now_iso8601()).build()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Input file, `input/logs.txt` when not set
    pub fn input_file(&self) -> PathBuf {
        PathBuf::from(self.get(INPUT_FILE).unwrap_or(DEFAULT_INPUT_FILE))
    }

    /// Output file, `output/result.csv` when not set
    pub fn output_file(&self) -> PathBuf {
        PathBuf::from(self.get(OUTPUT_FILE).unwrap_or(DEFAULT_OUTPUT_FILE))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl fmt::Display for JobParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        write!(f, "{{{}}}", pairs.join(", "))
    }
}

#[derive(Debug, Default)]
pub struct JobParametersBuilder {
    values: BTreeMap<String, String>,
}

impl JobParametersBuilder {
    pub fn add_string(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> JobParameters {
        JobParameters {
            values: self.values,
        }
    }
}

fn now_iso8601() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%.3f").to_string()
}

/// Terminal state of a job run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Succeeded,
    Failed,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Succeeded => write!(f, "SUCCEEDED"),
            JobStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// Outcome of one job run
#[derive(Debug, Clone, Serialize)]
pub struct JobExecution {
    pub job_name: String,
    pub parameters: JobParameters,
    pub status: JobStatus,
    pub stats: StepStats,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// Error message when `status` is `Failed`
    pub failure: Option<String>,
}

impl JobExecution {
    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Succeeded
    }

    /// Wall-clock duration of the run
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// Run one job body and record its outcome
///
/// The body reports its counters even when it fails. The final status is
/// logged exactly once here.
pub fn execute<F>(job_name: &str, parameters: JobParameters, body: F) -> JobExecution
where
    F: FnOnce(&JobParameters) -> (StepStats, Result<()>),
{
    info!(job = job_name, parameters = %parameters, "Job launched");
    let started_at = Utc::now();
    let (stats, result) = body(&parameters);
    let finished_at = Utc::now();

    let (status, failure) = match result {
        Ok(()) => (JobStatus::Succeeded, None),
        Err(e) => {
            error!(job = job_name, category = %e.category(), "Job failed: {}", e);
            (JobStatus::Failed, Some(e.to_string()))
        }
    };

    let execution = JobExecution {
        job_name: job_name.to_string(),
        parameters,
        status,
        stats,
        started_at,
        finished_at,
        failure,
    };
    info!(
        job = job_name,
        status = %execution.status,
        written = execution.stats.items_written,
        skipped = execution.stats.skipped_count(),
        duration_ms = execution.duration().num_milliseconds(),
        "Job finished"
    );
    execution
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_unset() {
        let params = JobParameters::builder().build();
        assert_eq!(params.input_file(), PathBuf::from("input/logs.txt"));
        assert_eq!(params.output_file(), PathBuf::from("output/result.csv"));
        assert!(params.get(TIMESTAMP).is_none());
    }

    #[test]
    fn test_for_file_sets_all_keys() {
        let params = JobParameters::for_file(Path::new("in/app.log"), Path::new("out/app.csv"));
        assert_eq!(params.get(INPUT_FILE), Some("in/app.log"));
        assert_eq!(params.get(OUTPUT_FILE), Some("out/app.csv"));

        let stamp = params.get(TIMESTAMP).unwrap();
        assert!(chrono::NaiveDateTime::parse_from_str(stamp, "%Y-%m-%dT%H:%M:%S%.3f").is_ok());
    }

    #[test]
    fn test_display_lists_keys_in_order() {
        let params = JobParameters::builder()
            .add_string(OUTPUT_FILE, "b.csv")
            .add_string(INPUT_FILE, "a.log")
            .build();
        assert_eq!(params.to_string(), "{inputFile=a.log, outputFile=b.csv}");
    }

    #[test]
    fn test_execute_records_success() {
        let params = JobParameters::for_tick();
        let execution = execute("noop", params.clone(), |p| {
            assert_eq!(p, &params);
            let stats = StepStats {
                read_count: 2,
                items_written: 2,
                ..Default::default()
            };
            (stats, Ok(()))
        });

        assert!(execution.is_success());
        assert_eq!(execution.job_name, "noop");
        assert_eq!(execution.stats.items_written, 2);
        assert!(execution.failure.is_none());
        assert!(execution.finished_at >= execution.started_at);
    }

    #[test]
    fn test_execute_records_failure() {
        let execution = execute("broken", JobParameters::default(), |_| {
            (
                StepStats::default(),
                Err(crate::error::FerryError::Other("disk gone".to_string())),
            )
        });

        assert_eq!(execution.status, JobStatus::Failed);
        assert_eq!(execution.failure.as_deref(), Some("disk gone"));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(JobStatus::Succeeded.to_string(), "SUCCEEDED");
        assert_eq!(JobStatus::Failed.to_string(), "FAILED");
    }
}
