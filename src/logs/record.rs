//! Structured record extracted from one log line

use chrono::NaiveDateTime;
use serde::Serialize;

/// Name used when the token payload yields no usable name
pub const UNKNOWN_NAME: &str = "Unknown";

/// One request line after extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogRecord {
    /// Request id, e.g. `T123`
    pub id: String,

    /// Request time as written in the log (no zone)
    pub timestamp: NaiveDateTime,

    /// Raw token text, used as the grouping key in CSV output
    pub token: String,

    /// Display name decoded from the token payload
    pub name: String,
}

impl LogRecord {
    pub fn new(
        id: impl Into<String>,
        timestamp: NaiveDateTime,
        token: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp,
            token: token.into(),
            name: name.into(),
        }
    }

    /// Whether the name fell back to [`UNKNOWN_NAME`]
    pub fn is_anonymous(&self) -> bool {
        self.name == UNKNOWN_NAME
    }
}
