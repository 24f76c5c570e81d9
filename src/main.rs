/*!
 * batchferry CLI - Command Line Interface
 *
 * Without a subcommand, processes every input file in the configured input
 * directory.
 */

use batchferry::{
    config::{FerryConfig, LogLevel},
    error::{FerryError, Result, EXIT_FATAL, EXIT_PARTIAL, EXIT_SUCCESS},
    launcher::{self, OrchestrationReport},
    logging,
    mirror::{MirrorOutcome, ScheduleSummary},
    JobExecution,
};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "batchferry")]
#[command(version, about = "Log-to-CSV extraction and remote tree mirroring", long_about = None)]
struct Cli {
    /// Path to config file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, value_enum, global = true)]
    log_level: Option<LogLevelArg>,

    /// Path to log file (default: stdout)
    #[arg(long, value_name = "FILE", global = true)]
    log: Option<PathBuf>,

    /// Enable verbose logging (equivalent to --log-level=debug)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Print the run summary as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Process every input file in the input directory (default)
    Process {
        /// Directory scanned for input files
        #[arg(long, value_name = "DIR")]
        input_dir: Option<PathBuf>,

        /// Directory receiving one CSV per input file
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,
    },

    /// Process a single log file into a single CSV file
    ProcessFile {
        /// Input log file
        #[arg(short = 'i', long, value_name = "FILE")]
        input: PathBuf,

        /// Output CSV file
        #[arg(short = 'o', long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Run the mirror job once
    Mirror,

    /// Run the mirror job on its configured interval
    Schedule {
        /// Stop after this many runs (default: run until interrupted)
        #[arg(long)]
        max_runs: Option<u64>,
    },

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LogLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();

    if let Some(Commands::Completions { shell }) = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "batchferry", &mut std::io::stdout());
        return Ok(EXIT_SUCCESS);
    }

    let mut config = match cli.config {
        Some(ref path) => FerryConfig::from_file(path)?,
        None => FerryConfig::default(),
    };
    if let Some(level) = cli.log_level {
        config.log_level = level.into();
    }
    if cli.log.is_some() {
        config.log_file = cli.log.clone();
    }
    config.verbose |= cli.verbose;
    if let Some(Commands::Process {
        ref input_dir,
        ref output_dir,
    }) = cli.command
    {
        if let Some(dir) = input_dir {
            config.batch.input_dir = dir.clone();
        }
        if let Some(dir) = output_dir {
            config.batch.output_dir = dir.clone();
        }
    }

    config.validate()?;
    logging::init_logging(&config)?;

    match cli.command {
        None | Some(Commands::Process { .. }) => {
            let report = launcher::process_all_files(&config.batch)?;
            print_report(&report, cli.json)?;
            Ok(if report.failed() > 0 {
                EXIT_PARTIAL
            } else {
                EXIT_SUCCESS
            })
        }
        Some(Commands::ProcessFile { input, output }) => {
            let execution = launcher::process_file(&input, &output, &config.batch);
            print_execution(&execution, cli.json)?;
            Ok(if execution.is_success() {
                EXIT_SUCCESS
            } else {
                EXIT_PARTIAL
            })
        }
        Some(Commands::Mirror) => {
            let Some(outcome) = launcher::mirror_once(&config)? else {
                println!("Mirror job is disabled (set mirror.enabled = true)");
                return Ok(EXIT_SUCCESS);
            };
            print_mirror(&outcome, cli.json)?;
            Ok(if outcome.is_clean() {
                EXIT_SUCCESS
            } else if outcome.execution.is_success() {
                EXIT_PARTIAL
            } else {
                EXIT_FATAL
            })
        }
        Some(Commands::Schedule { max_runs }) => {
            let summary = launcher::schedule_mirror(&config, max_runs)?;
            print_schedule(&summary, cli.json)?;
            Ok(if summary.failed_runs > 0 {
                EXIT_PARTIAL
            } else {
                EXIT_SUCCESS
            })
        }
        Some(Commands::Completions { .. }) => Ok(EXIT_SUCCESS),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| FerryError::Other(format!("Failed to serialize summary: {}", e)))?;
    println!("{}", text);
    Ok(())
}

fn print_execution(execution: &JobExecution, json: bool) -> Result<()> {
    if json {
        return print_json(execution);
    }
    let stats = &execution.stats;
    println!(
        "{} {} in {} ms: read {}, written {}, skipped {}, rejected {}",
        execution.job_name,
        execution.status,
        execution.duration().num_milliseconds(),
        stats.read_count,
        stats.items_written,
        stats.skipped_count(),
        stats.rejected_count
    );
    if let Some(ref failure) = execution.failure {
        println!("  failure: {}", failure);
    }
    Ok(())
}

fn print_report(report: &OrchestrationReport, json: bool) -> Result<()> {
    if json {
        return print_json(report);
    }
    if report.is_empty() {
        println!("No input files found");
        return Ok(());
    }
    for execution in &report.executions {
        print!("{}: ", execution.parameters.input_file().display());
        print_execution(execution, false)?;
    }
    println!(
        "{} file(s) succeeded, {} failed",
        report.succeeded(),
        report.failed()
    );
    Ok(())
}

fn print_mirror(outcome: &MirrorOutcome, json: bool) -> Result<()> {
    if json {
        return print_json(outcome);
    }
    print_execution(&outcome.execution, false)?;
    let transfer = &outcome.transfer;
    println!(
        "  files transferred {}, failed {}, bytes {}",
        transfer.files_transferred, transfer.files_failed, transfer.bytes_transferred
    );
    Ok(())
}

fn print_schedule(summary: &ScheduleSummary, json: bool) -> Result<()> {
    if json {
        return print_json(summary);
    }
    println!(
        "Scheduler stopped after {} run(s): {} failed, {} missed tick(s)",
        summary.runs, summary.failed_runs, summary.missed_ticks
    );
    Ok(())
}
