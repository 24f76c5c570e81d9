/*!
 * Error types for batchferry
 */

use std::fmt;
use std::io;
use std::path::PathBuf;

use ferry_core_interface::RemoteFsError;

use crate::logs::TokenError;

pub type Result<T> = std::result::Result<T, FerryError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_PARTIAL: i32 = 1;
pub const EXIT_FATAL: i32 = 2;

#[derive(Debug)]
pub enum FerryError {
    /// I/O error
    Io(io::Error),

    /// Configuration error
    Config(String),

    /// A log line passed the gate but could not be parsed
    MalformedInput { reason: String, line: String },

    /// Embedded token could not be decoded
    Token(String),

    /// Output sink could not be opened or written
    Sink { path: PathBuf, source: io::Error },

    /// Remote capability call failed
    Remote(RemoteFsError),

    /// Session could not be established
    Connection { endpoint: String, message: String },

    /// Authentication error
    Authentication(String),

    /// A single file transfer failed
    Transfer { remote_path: String, message: String },

    /// Generic error with message
    Other(String),
}

impl FerryError {
    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            FerryError::Config(_)
            | FerryError::Authentication(_)
            | FerryError::Connection { .. } => EXIT_FATAL,
            _ => EXIT_PARTIAL,
        }
    }

    /// Check if this error aborts the surrounding run
    ///
    /// Item-level errors are only fatal to the line or file they describe.
    pub fn is_fatal(&self) -> bool {
        match self {
            FerryError::Config(_) => true,
            FerryError::Sink { .. } => true,
            FerryError::Connection { .. } => true,
            FerryError::Authentication(_) => true,

            FerryError::Io(_) => false,
            FerryError::MalformedInput { .. } => false,
            FerryError::Token(_) => false,
            FerryError::Remote(_) => false,
            FerryError::Transfer { .. } => false,
            FerryError::Other(_) => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            FerryError::Io(_) => ErrorCategory::IoError,
            FerryError::Config(_) => ErrorCategory::Configuration,
            FerryError::MalformedInput { .. } | FerryError::Token(_) => ErrorCategory::Input,
            FerryError::Sink { .. } | FerryError::Transfer { .. } => ErrorCategory::Sink,
            FerryError::Remote(_) => ErrorCategory::Capability,
            FerryError::Connection { .. } => ErrorCategory::Network,
            FerryError::Authentication(_) => ErrorCategory::Security,
            FerryError::Other(_) => ErrorCategory::Unknown,
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>, line: &str) -> Self {
        FerryError::MalformedInput {
            reason: reason.into(),
            line: line.to_string(),
        }
    }
}

/// Error category for classification and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// I/O operation errors
    IoError,
    /// Configuration errors
    Configuration,
    /// Malformed input lines and tokens
    Input,
    /// CSV sink and file transfer errors
    Sink,
    /// Remote stat/list/read errors
    Capability,
    /// Session establishment errors
    Network,
    /// Authentication errors
    Security,
    /// Uncategorized errors
    Unknown,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::IoError => write!(f, "io"),
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Input => write!(f, "input"),
            ErrorCategory::Sink => write!(f, "sink"),
            ErrorCategory::Capability => write!(f, "capability"),
            ErrorCategory::Network => write!(f, "network"),
            ErrorCategory::Security => write!(f, "security"),
            ErrorCategory::Unknown => write!(f, "unknown"),
        }
    }
}

impl fmt::Display for FerryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FerryError::Io(err) => {
                write!(f, "I/O error: {}", err)
            }
            FerryError::Config(msg) => {
                write!(f, "Configuration error: {}", msg)
            }
            FerryError::MalformedInput { reason, line } => {
                write!(f, "Malformed line ({}): {}", reason, line)
            }
            FerryError::Token(msg) => {
                write!(f, "Token decode error: {}", msg)
            }
            FerryError::Sink { path, source } => {
                write!(f, "Failed to write {}: {}", path.display(), source)
            }
            FerryError::Remote(err) => {
                write!(f, "Remote error: {}", err)
            }
            FerryError::Connection { endpoint, message } => {
                write!(f, "Connection to {} failed: {}", endpoint, message)
            }
            FerryError::Authentication(msg) => {
                write!(f, "Authentication error: {}", msg)
            }
            FerryError::Transfer {
                remote_path,
                message,
            } => {
                write!(f, "Transfer of {} failed: {}", remote_path, message)
            }
            FerryError::Other(msg) => {
                write!(f, "{}", msg)
            }
        }
    }
}

impl std::error::Error for FerryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FerryError::Io(err) => Some(err),
            FerryError::Sink { source, .. } => Some(source),
            FerryError::Remote(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for FerryError {
    fn from(err: io::Error) -> Self {
        FerryError::Io(err)
    }
}

impl From<RemoteFsError> for FerryError {
    fn from(err: RemoteFsError) -> Self {
        FerryError::Remote(err)
    }
}

impl From<TokenError> for FerryError {
    fn from(err: TokenError) -> Self {
        FerryError::Token(err.to_string())
    }
}

impl From<toml::de::Error> for FerryError {
    fn from(err: toml::de::Error) -> Self {
        FerryError::Config(format!("TOML parse error: {}", err))
    }
}
