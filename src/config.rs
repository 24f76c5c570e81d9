/*!
 * Configuration types for batchferry
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{FerryError, Result};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FerryConfig {
    /// Log level for diagnostic output
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log file path (None = stdout)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Enable verbose logging (shorthand for log_level = debug)
    #[serde(default)]
    pub verbose: bool,

    /// Log-to-CSV job settings
    #[serde(default)]
    pub batch: BatchConfig,

    /// Remote mirror job settings
    #[serde(default)]
    pub mirror: MirrorConfig,
}

/// Settings for the log-to-CSV job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Directory scanned for input files
    #[serde(default = "default_input_dir")]
    pub input_dir: PathBuf,

    /// Directory receiving one CSV per input file
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Accepted input extensions (plain text and log)
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Items per committed chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// chrono format used both to parse log timestamps and to write CSV
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,

    /// Substring a line must contain to be considered at all
    #[serde(default = "default_marker")]
    pub marker: String,

    /// Letter prefix of the record id (`T` matches `T123`)
    #[serde(default = "default_id_prefix")]
    pub id_prefix: String,

    /// Token payload field holding the display name
    #[serde(default = "default_name_field")]
    pub name_field: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            input_dir: default_input_dir(),
            output_dir: default_output_dir(),
            extensions: default_extensions(),
            chunk_size: default_chunk_size(),
            timestamp_format: default_timestamp_format(),
            marker: default_marker(),
            id_prefix: default_id_prefix(),
            name_field: default_name_field(),
        }
    }
}

impl BatchConfig {
    /// Whether `path` carries one of the accepted extensions
    pub fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|accepted| accepted == ext))
            .unwrap_or(false)
    }
}

/// Where the mirror job reads from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MirrorBackend {
    /// SSH/SFTP session (requires the `ssh-backend` feature)
    #[default]
    Sftp,

    /// A locally mounted tree
    Local,
}

/// Settings for the remote mirror job
#[derive(Clone, Serialize, Deserialize)]
pub struct MirrorConfig {
    /// Run the mirror job at all
    #[serde(default)]
    pub enabled: bool,

    /// Session backend
    #[serde(default)]
    pub backend: MirrorBackend,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub username: String,

    /// Password authentication (also the fallback when key auth fails)
    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    /// Private key authentication, preferred when set
    #[serde(default)]
    pub private_key_path: Option<PathBuf>,

    /// Passphrase for the private key
    #[serde(default, skip_serializing)]
    pub passphrase: Option<String>,

    /// Remote files or directories to mirror
    #[serde(default)]
    pub targets: Vec<String>,

    /// Directory remote paths are resolved under for the local backend
    #[serde(default = "default_source_root")]
    pub source_root: PathBuf,

    /// Local directory the remote tree is re-based under
    #[serde(default = "default_local_base_dir")]
    pub local_base_dir: PathBuf,

    /// Seconds between scheduled runs
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Bound on TCP connect + handshake
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Files per committed chunk
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            backend: MirrorBackend::Sftp,
            host: default_host(),
            port: default_port(),
            username: String::new(),
            password: None,
            private_key_path: None,
            passphrase: None,
            targets: Vec::new(),
            source_root: default_source_root(),
            local_base_dir: default_local_base_dir(),
            interval_secs: default_interval_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            chunk_size: default_chunk_size(),
        }
    }
}

// Secrets stay out of Debug output, and therefore out of logs
impl fmt::Debug for MirrorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |secret: &Option<String>| secret.as_ref().map(|_| "***");
        f.debug_struct("MirrorConfig")
            .field("enabled", &self.enabled)
            .field("backend", &self.backend)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("private_key_path", &self.private_key_path)
            .field("passphrase", &redact(&self.passphrase))
            .field("targets", &self.targets)
            .field("source_root", &self.source_root)
            .field("local_base_dir", &self.local_base_dir)
            .field("interval_secs", &self.interval_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("chunk_size", &self.chunk_size)
            .finish()
    }
}

impl MirrorConfig {
    /// `host:port` as used in logs and connection errors
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn has_password(&self) -> bool {
        self.password.as_deref().is_some_and(|p| !p.trim().is_empty())
    }

    pub fn has_private_key(&self) -> bool {
        self.private_key_path
            .as_ref()
            .is_some_and(|p| !p.as_os_str().is_empty())
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Info, warnings, and errors
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

// Default value functions for serde
fn default_input_dir() -> PathBuf {
    PathBuf::from("input")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_extensions() -> Vec<String> {
    vec!["txt".to_string(), "log".to_string()]
}

fn default_chunk_size() -> usize {
    10
}

fn default_timestamp_format() -> String {
    "%Y-%m-%d %H:%M:%S".to_string()
}

fn default_marker() -> String {
    "[REQ]".to_string()
}

fn default_id_prefix() -> String {
    "T".to_string()
}

fn default_name_field() -> String {
    "name".to_string()
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    22
}

fn default_source_root() -> PathBuf {
    PathBuf::from("/")
}

fn default_local_base_dir() -> PathBuf {
    PathBuf::from("sftp-downloads")
}

fn default_interval_secs() -> u64 {
    3600 // hourly
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl FerryConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            FerryError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: FerryConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a TOML file (secrets are not written)
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| FerryError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Check settings that would otherwise only fail mid-run
    pub fn validate(&self) -> Result<()> {
        if self.batch.chunk_size == 0 {
            return Err(FerryError::Config(
                "batch.chunk_size must be greater than 0".to_string(),
            ));
        }
        if self.batch.extensions.len() != 2 {
            return Err(FerryError::Config(format!(
                "batch.extensions must list exactly two extensions, got {}",
                self.batch.extensions.len()
            )));
        }
        if self.batch.marker.is_empty() || self.batch.id_prefix.is_empty() {
            return Err(FerryError::Config(
                "batch.marker and batch.id_prefix must not be empty".to_string(),
            ));
        }
        self.validate_mirror()
    }

    /// Mirror checks only apply when the job is enabled
    pub fn validate_mirror(&self) -> Result<()> {
        let mirror = &self.mirror;
        if !mirror.enabled {
            return Ok(());
        }
        if mirror.chunk_size == 0 {
            return Err(FerryError::Config(
                "mirror.chunk_size must be greater than 0".to_string(),
            ));
        }
        if mirror.interval_secs == 0 {
            return Err(FerryError::Config(
                "mirror.interval_secs must be greater than 0".to_string(),
            ));
        }
        if mirror.backend == MirrorBackend::Sftp {
            if mirror.host.trim().is_empty() || mirror.username.trim().is_empty() {
                return Err(FerryError::Config(
                    "mirror.host and mirror.username are required for the sftp backend"
                        .to_string(),
                ));
            }
            if !mirror.has_password() && !mirror.has_private_key() {
                return Err(FerryError::Config(
                    "Either mirror.password or mirror.private_key_path must be configured"
                        .to_string(),
                ));
            }
        }
        Ok(())
    }
}
