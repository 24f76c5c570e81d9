//! CSV output for decoded log records
//!
//! Each chunk is grouped by token (first occurrence order of distinct
//! tokens, encounter order within a group) and written as one line per
//! record: `"id","timestamp","token","name"`. Every field is quoted and
//! embedded quotes are doubled.
//!
//! The destination is truncated on the first write of a run; later chunks
//! are appended to the same stream and flushed before `write` returns.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::record::LogRecord;
use crate::error::{FerryError, Result};
use crate::pipeline::{Chunk, ItemWriter};

pub struct CsvRecordSink {
    path: PathBuf,
    timestamp_format: String,
    out: Option<BufWriter<File>>,
    lines_written: u64,
}

impl CsvRecordSink {
    /// Create a sink for `path`, creating its parent directory
    pub fn new(path: impl Into<PathBuf>, timestamp_format: impl Into<String>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| FerryError::Sink {
                path: path.clone(),
                source,
            })?;
        }
        Ok(Self {
            path,
            timestamp_format: timestamp_format.into(),
            out: None,
            lines_written: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    fn stream(&mut self) -> Result<&mut BufWriter<File>> {
        if self.out.is_none() {
            let file = File::create(&self.path).map_err(|source| FerryError::Sink {
                path: self.path.clone(),
                source,
            })?;
            debug!(path = %self.path.display(), "Opened CSV output");
            self.out = Some(BufWriter::new(file));
        }
        self.out
            .as_mut()
            .ok_or_else(|| FerryError::Other("CSV stream unavailable".to_string()))
    }

    fn sink_error(&self, source: std::io::Error) -> FerryError {
        FerryError::Sink {
            path: self.path.clone(),
            source,
        }
    }
}

impl ItemWriter<LogRecord> for CsvRecordSink {
    fn write(&mut self, chunk: Chunk<LogRecord>) -> Result<()> {
        let records = group_by_token(chunk.into_inner());
        let count = records.len() as u64;
        let mut text = String::new();
        for record in &records {
            text.push_str(&format_record(record, &self.timestamp_format));
            text.push('\n');
        }

        let out = self.stream()?;
        let result = out.write_all(text.as_bytes()).and_then(|_| out.flush());
        result.map_err(|e| self.sink_error(e))?;
        self.lines_written += count;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        // Runs that accepted nothing still leave an (empty) output file
        let out = self.stream()?;
        let result = out.flush();
        result.map_err(|e| self.sink_error(e))
    }
}

/// Reorder records so that equal tokens are adjacent
///
/// Groups appear in the order their token was first seen and records keep
/// their relative order inside a group.
pub fn group_by_token(records: Vec<LogRecord>) -> Vec<LogRecord> {
    let mut groups: Vec<(String, Vec<LogRecord>)> = Vec::new();
    for record in records {
        match groups.iter_mut().find(|(token, _)| *token == record.token) {
            Some((_, members)) => members.push(record),
            None => groups.push((record.token.clone(), vec![record])),
        }
    }
    groups.into_iter().flat_map(|(_, members)| members).collect()
}

/// Format one record as a CSV line (without terminator)
pub fn format_record(record: &LogRecord, timestamp_format: &str) -> String {
    let timestamp = record.timestamp.format(timestamp_format).to_string();
    format_csv_line(&[
        record.id.as_str(),
        timestamp.as_str(),
        record.token.as_str(),
        record.name.as_str(),
    ])
}

/// Quote every field and join with commas
pub fn format_csv_line(fields: &[&str]) -> String {
    fields
        .iter()
        .map(|f| escape_csv(f))
        .collect::<Vec<_>>()
        .join(",")
}

/// Wrap a field in quotes, doubling embedded quotes
pub fn escape_csv(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Split one CSV line into fields
///
/// Understands quoted fields with doubled quotes as written by
/// [`format_csv_line`], and bare fields. Returns `None` for an unterminated
/// quote or stray text after a closing quote.
pub fn parse_csv_line(line: &str) -> Option<Vec<String>> {
    let mut fields = Vec::new();
    let mut chars = line.chars().peekable();

    loop {
        let mut field = String::new();
        if chars.peek() == Some(&'"') {
            chars.next();
            loop {
                match chars.next()? {
                    '"' if chars.peek() == Some(&'"') => {
                        chars.next();
                        field.push('"');
                    }
                    '"' => break,
                    c => field.push(c),
                }
            }
            match chars.next() {
                None => {
                    fields.push(field);
                    return Some(fields);
                }
                Some(',') => fields.push(field),
                Some(_) => return None,
            }
        } else {
            loop {
                match chars.next() {
                    None => {
                        fields.push(field);
                        return Some(fields);
                    }
                    Some(',') => break,
                    Some(c) => field.push(c),
                }
            }
            fields.push(field);
        }
    }
}
