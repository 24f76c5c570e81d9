//! Request line parser
//!
//! A line is only considered when it contains the marker (`[REQ]` by
//! default). Qualifying lines must then carry, in any position:
//!
//! - an id: the id prefix followed by digits (`T123`)
//! - a timestamp: `YYYY-MM-DD HH:MM:SS`
//! - a token: the bracketed run at the very end of the line
//!
//! The first match of each wins. A missing piece rejects the line; a token
//! that cannot be decoded only costs the name.

use chrono::NaiveDateTime;
use regex::Regex;
use tracing::{debug, warn};

use super::record::{LogRecord, UNKNOWN_NAME};
use super::token::TokenPayloadDecoder;
use crate::config::BatchConfig;
use crate::error::{FerryError, Result};
use crate::pipeline::{ItemProcessor, Processed};

// ASCII digits only
const TIMESTAMP_PATTERN: &str = r"[0-9]{4}-[0-9]{2}-[0-9]{2} [0-9]{2}:[0-9]{2}:[0-9]{2}";
const TOKEN_PATTERN: &str = r"\[([A-Za-z0-9._\-]+)\]\s*$";

#[derive(Debug, Clone)]
pub struct LogLineParser {
    marker: String,
    id_regex: Regex,
    timestamp_regex: Regex,
    token_regex: Regex,
    timestamp_format: String,
    decoder: TokenPayloadDecoder,
}

impl LogLineParser {
    pub fn new(settings: &BatchConfig) -> Result<Self> {
        let id_pattern = format!(r"{}[0-9]+", regex::escape(&settings.id_prefix));
        Ok(Self {
            marker: settings.marker.clone(),
            id_regex: compile(&id_pattern)?,
            timestamp_regex: compile(TIMESTAMP_PATTERN)?,
            token_regex: compile(TOKEN_PATTERN)?,
            timestamp_format: settings.timestamp_format.clone(),
            decoder: TokenPayloadDecoder::new(settings.name_field.clone()),
        })
    }

    /// Parse one line into a record, a skip, or a rejection
    pub fn parse(&self, line: &str) -> Processed<LogRecord> {
        if !line.contains(&self.marker) {
            return Processed::Skip;
        }

        let id = match self.id_regex.find(line) {
            Some(m) => m.as_str(),
            None => return Processed::Reject(FerryError::malformed("ID not found", line)),
        };

        let timestamp = match self.timestamp_regex.find(line) {
            Some(m) => match NaiveDateTime::parse_from_str(m.as_str(), &self.timestamp_format) {
                Ok(ts) => ts,
                Err(e) => {
                    return Processed::Reject(FerryError::malformed(
                        format!("DateTime unparsable: {}", e),
                        line,
                    ))
                }
            },
            None => return Processed::Reject(FerryError::malformed("DateTime not found", line)),
        };

        let token = match self.token_regex.captures(line).and_then(|c| c.get(1)) {
            Some(m) => m.as_str(),
            None => return Processed::Reject(FerryError::malformed("Token not found", line)),
        };

        let name = match self.decoder.decode(token) {
            Ok(name) => name,
            Err(e) => {
                let err = FerryError::from(e);
                warn!(id, category = %err.category(), "{}, using '{}'", err, UNKNOWN_NAME);
                UNKNOWN_NAME.to_string()
            }
        };

        debug!(id, %timestamp, name = %name, "Parsed request line");
        Processed::Accept(LogRecord::new(id, timestamp, token, name))
    }
}

impl ItemProcessor<String, LogRecord> for LogLineParser {
    fn process(&mut self, line: String) -> Result<Processed<LogRecord>> {
        Ok(self.parse(&line))
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| FerryError::Config(format!("Invalid pattern '{}': {}", pattern, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const ALICE_TOKEN: &str = "eyJhbGciOiJIUzI1NiJ9.eyJuYW1lIjoiQWxpY2UifQ.sig";

    fn parser() -> LogLineParser {
        LogLineParser::new(&BatchConfig::default()).unwrap()
    }

    fn accepted(result: Processed<LogRecord>) -> LogRecord {
        match result {
            Processed::Accept(record) => record,
            other => panic!("expected a record, got {:?}", other),
        }
    }

    fn rejection_reason(result: Processed<LogRecord>) -> String {
        match result {
            Processed::Reject(FerryError::MalformedInput { reason, .. }) => reason,
            other => panic!("expected a rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_full_line() {
        let line = format!("2024-01-01 10:00:00 [REQ] T123 user login [{}]", ALICE_TOKEN);
        let record = accepted(parser().parse(&line));

        assert_eq!(record.id, "T123");
        assert_eq!(
            record.timestamp,
            NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap()
        );
        assert_eq!(record.token, ALICE_TOKEN);
        assert_eq!(record.name, "Alice");
        assert!(!record.is_anonymous());
    }

    #[test]
    fn test_line_without_marker_is_skipped() {
        let line = format!("2024-01-01 10:00:00 [RES] T123 [{}]", ALICE_TOKEN);
        assert!(matches!(parser().parse(&line), Processed::Skip));
        assert!(matches!(parser().parse(""), Processed::Skip));
    }

    #[test]
    fn test_missing_pieces_are_rejected() {
        let p = parser();
        assert_eq!(
            rejection_reason(p.parse(&format!("2024-01-01 10:00:00 [REQ] [{}]", ALICE_TOKEN))),
            "ID not found"
        );
        assert_eq!(
            rejection_reason(p.parse(&format!("[REQ] T1 [{}]", ALICE_TOKEN))),
            "DateTime not found"
        );
        assert_eq!(
            rejection_reason(p.parse("2024-01-01 10:00:00 [REQ] T1 no token here")),
            "Token not found"
        );
    }

    #[test]
    fn test_impossible_date_is_rejected() {
        let line = format!("2024-13-45 10:00:00 [REQ] T9 [{}]", ALICE_TOKEN);
        let reason = rejection_reason(parser().parse(&line));
        assert!(reason.starts_with("DateTime unparsable"));
    }

    #[test]
    fn test_undecodable_token_falls_back_to_unknown() {
        let line = "2024-01-01 10:00:00 [REQ] T5 [aaa.bbb.ccc]";
        let record = accepted(parser().parse(line));
        assert_eq!(record.token, "aaa.bbb.ccc");
        assert_eq!(record.name, UNKNOWN_NAME);
        assert!(record.is_anonymous());
    }

    #[test]
    fn test_token_must_end_the_line() {
        let line = format!("2024-01-01 10:00:00 [REQ] T5 [{}] trailing", ALICE_TOKEN);
        assert_eq!(rejection_reason(parser().parse(&line)), "Token not found");

        let padded = format!("2024-01-01 10:00:00 [REQ] T5 [{}]   ", ALICE_TOKEN);
        assert_eq!(accepted(parser().parse(&padded)).name, "Alice");
    }

    #[test]
    fn test_first_id_wins() {
        let line = format!("2024-01-01 10:00:00 [REQ] T7 retry of T6 [{}]", ALICE_TOKEN);
        assert_eq!(accepted(parser().parse(&line)).id, "T7");
    }

    #[test]
    fn test_non_ascii_digits_are_not_matched() {
        let line = format!(
            "ref \u{662}\u{660}\u{662}\u{664}-\u{660}\u{661}-\u{660}\u{661} \
             \u{660}\u{660}:\u{660}\u{660}:\u{660}\u{660} \
             2024-01-01 10:00:00 [REQ] T\u{661} T123 [{}]",
            ALICE_TOKEN
        );
        let record = accepted(parser().parse(&line));

        assert_eq!(record.id, "T123");
        assert_eq!(
            record.timestamp,
            NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap()
        );
        assert_eq!(record.name, "Alice");
    }

    #[test]
    fn test_non_ascii_id_digits_alone_are_rejected() {
        let line = format!("2024-01-01 10:00:00 [REQ] T\u{661}\u{662} [{}]", ALICE_TOKEN);
        assert_eq!(rejection_reason(parser().parse(&line)), "ID not found");
    }

    #[test]
    fn test_custom_marker_and_prefix() {
        let settings = BatchConfig {
            marker: "<in>".to_string(),
            id_prefix: "REQ-".to_string(),
            ..Default::default()
        };
        let p = LogLineParser::new(&settings).unwrap();
        let line = format!("2024-01-01 10:00:00 <in> REQ-88 [{}]", ALICE_TOKEN);
        assert_eq!(accepted(p.parse(&line)).id, "REQ-88");
    }

    #[test]
    fn test_processor_never_fails() {
        let mut p = parser();
        let result = p.process("[REQ] garbage".to_string());
        assert!(matches!(result, Ok(Processed::Reject(_))));
    }
}
