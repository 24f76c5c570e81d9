//! Line reader over one input file

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{FerryError, Result};
use crate::pipeline::ItemReader;

/// Yields the lines of a file, one per `read`
///
/// The file is opened on the first read, so building a step never touches
/// the filesystem. Line terminators are stripped, blank lines are skipped
/// without ending input and invalid UTF-8 is replaced rather than failing the
/// job.
pub struct LogFileReader {
    path: PathBuf,
    reader: Option<BufReader<File>>,
    buf: Vec<u8>,
    line_number: u64,
}

impl LogFileReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            reader: None,
            buf: Vec::new(),
            line_number: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Physical line number of the last line returned
    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    fn open(&mut self) -> Result<&mut BufReader<File>> {
        if self.reader.is_none() {
            let file = File::open(&self.path).map_err(|e| {
                FerryError::Other(format!("Cannot open {}: {}", self.path.display(), e))
            })?;
            debug!(path = %self.path.display(), "Opened input file");
            self.reader = Some(BufReader::new(file));
        }
        self.reader
            .as_mut()
            .ok_or_else(|| FerryError::Other("input reader unavailable".to_string()))
    }
}

impl ItemReader<String> for LogFileReader {
    fn read(&mut self) -> Result<Option<String>> {
        loop {
            self.buf.clear();
            let mut buf = std::mem::take(&mut self.buf);
            let read = self.open()?.read_until(b'\n', &mut buf)?;
            self.buf = buf;

            if read == 0 {
                return Ok(None);
            }
            self.line_number += 1;

            while matches!(self.buf.last(), Some(b'\n' | b'\r')) {
                self.buf.pop();
            }
            if self.buf.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            return Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn read_all(reader: &mut LogFileReader) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(line) = reader.read().unwrap() {
            lines.push(line);
        }
        lines
    }

    #[test]
    fn test_reads_lines_and_strips_terminators() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "first\r\nsecond\nthird").unwrap();

        let mut reader = LogFileReader::new(&path);
        assert_eq!(read_all(&mut reader), vec!["first", "second", "third"]);
        assert_eq!(reader.line_number(), 3);
        assert_eq!(reader.read().unwrap(), None);
    }

    #[test]
    fn test_blank_lines_do_not_end_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gaps.log");
        fs::write(&path, "a\n\n   \nb\n\n").unwrap();

        let mut reader = LogFileReader::new(&path);
        assert_eq!(read_all(&mut reader), vec!["a", "b"]);
        assert_eq!(reader.line_number(), 5);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bin.log");
        fs::write(&path, b"ok \xff end\n").unwrap();

        let mut reader = LogFileReader::new(&path);
        let line = reader.read().unwrap().unwrap();
        assert!(line.starts_with("ok "));
        assert!(line.ends_with(" end"));
        assert!(line.contains('\u{FFFD}'));
    }

    #[test]
    fn test_missing_file_fails_on_first_read() {
        let dir = tempfile::tempdir().unwrap();
        let mut reader = LogFileReader::new(dir.path().join("absent.log"));
        assert!(reader.read().is_err());
    }
}
