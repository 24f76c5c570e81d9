/*!
 * Log-to-CSV job
 *
 * Reads one log file line by line, extracts request records from lines
 * carrying the request marker, and writes them as CSV grouped by token.
 */

pub mod csv_sink;
pub mod parser;
pub mod reader;
pub mod record;
pub mod token;

pub use csv_sink::{escape_csv, format_csv_line, parse_csv_line, CsvRecordSink};
pub use parser::LogLineParser;
pub use reader::LogFileReader;
pub use record::{LogRecord, UNKNOWN_NAME};
pub use token::{TokenError, TokenPayloadDecoder};

use std::path::Path;

use crate::config::BatchConfig;
use crate::error::Result;
use crate::job::{self, JobExecution, JobParameters};
use crate::pipeline::{ChunkStep, StepStats};

/// Job name used in logs and executions
pub const LOG_JOB_NAME: &str = "logProcessingJob";

/// Step type of one log-to-CSV run
pub type LogStep = ChunkStep<String, LogRecord, LogFileReader, LogLineParser, CsvRecordSink>;

/// Wire reader, parser and sink for one input/output pair
pub fn build_log_step(input: &Path, output: &Path, settings: &BatchConfig) -> Result<LogStep> {
    let reader = LogFileReader::new(input);
    let parser = LogLineParser::new(settings)?;
    let sink = CsvRecordSink::new(output, settings.timestamp_format.clone())?;
    ChunkStep::new("logProcessingStep", reader, parser, sink, settings.chunk_size)
}

/// Run the log job for the files named in `parameters`
pub fn run_log_job(parameters: JobParameters, settings: &BatchConfig) -> JobExecution {
    job::execute(LOG_JOB_NAME, parameters, |params| {
        let input = params.input_file();
        let output = params.output_file();
        match build_log_step(&input, &output, settings) {
            Ok(step) => step.run_with_stats(),
            Err(e) => (StepStats::default(), Err(e)),
        }
    })
}
