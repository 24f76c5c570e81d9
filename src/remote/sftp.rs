//! SFTP session over ssh2
//!
//! Establishes a blocking SSH session with a bounded connect timeout,
//! authenticates with a private key or a password, and opens the SFTP
//! subsystem. The session is torn down on [`SftpSession::close`] or on drop.
//!
//! The timeout covers session setup only (TCP connect, handshake,
//! authentication, SFTP channel). Listings and file reads on an open session
//! block without a limit. Host keys are not verified.

use secrecy::{ExposeSecret, SecretString};
use ssh2::{ErrorCode, Session, Sftp};
use std::io::Read;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use ferry_core_interface::{RemoteEntry, RemoteFs, RemoteFsError, RemoteMetadata};

use crate::config::MirrorConfig;
use crate::error::{FerryError, Result};

// libssh2 SFTP status codes
const FX_NO_SUCH_FILE: i32 = 2;
const FX_PERMISSION_DENIED: i32 = 3;

/// SSH authentication method
pub enum SshAuth {
    /// Password authentication
    Password(SecretString),

    /// Public key authentication with private key file
    KeyFile {
        /// Path to private key file
        key_path: PathBuf,
        /// Optional passphrase for the key
        passphrase: Option<SecretString>,
        /// Password tried when the key is missing or rejected
        fallback_password: Option<SecretString>,
    },
}

impl SshAuth {
    /// Pick the method from settings: key file first, then password
    pub fn from_settings(settings: &MirrorConfig) -> Result<Self> {
        let password = settings
            .password
            .clone()
            .filter(|p| !p.trim().is_empty())
            .map(SecretString::from);

        let key_path = settings
            .private_key_path
            .clone()
            .filter(|p| !p.as_os_str().is_empty());

        match key_path {
            Some(key_path) => Ok(SshAuth::KeyFile {
                key_path,
                passphrase: settings.passphrase.clone().map(SecretString::from),
                fallback_password: password,
            }),
            None => password.map(SshAuth::Password).ok_or_else(|| {
                FerryError::Config(
                    "Either mirror.password or mirror.private_key_path must be configured"
                        .to_string(),
                )
            }),
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            SshAuth::Password(_) => "password",
            SshAuth::KeyFile { .. } => "key file",
        }
    }
}

/// An open SFTP session
pub struct SftpSession {
    endpoint: String,
    session: Session,
    sftp: Option<Sftp>,
}

impl SftpSession {
    /// Connect, authenticate and open the SFTP subsystem
    pub fn connect(settings: &MirrorConfig) -> Result<Self> {
        let endpoint = settings.endpoint();
        let auth = SshAuth::from_settings(settings)?;
        let timeout = Duration::from_secs(settings.connect_timeout_secs);

        let connection_error = |message: String| FerryError::Connection {
            endpoint: endpoint.clone(),
            message,
        };

        let addr = (settings.host.as_str(), settings.port)
            .to_socket_addrs()
            .map_err(|e| connection_error(format!("cannot resolve host: {}", e)))?
            .next()
            .ok_or_else(|| connection_error("host resolved to no address".to_string()))?;

        let tcp = TcpStream::connect_timeout(&addr, timeout)
            .map_err(|e| connection_error(e.to_string()))?;

        let mut session = Session::new()
            .map_err(|e| connection_error(format!("Failed to create SSH session: {}", e)))?;
        session.set_tcp_stream(tcp);
        set_setup_timeout(&session, timeout);
        session
            .handshake()
            .map_err(|e| connection_error(format!("SSH handshake failed: {}", e)))?;

        authenticate(&session, &settings.username, &auth)?;
        if !session.authenticated() {
            return Err(FerryError::Authentication(format!(
                "{} authentication failed for {}",
                auth.describe(),
                settings.username
            )));
        }

        let sftp = session
            .sftp()
            .map_err(|e| connection_error(format!("Failed to open SFTP channel: {}", e)))?;
        clear_timeout(&session);

        info!(
            endpoint = %endpoint,
            user = %settings.username,
            method = auth.describe(),
            "SFTP session opened"
        );
        Ok(Self {
            endpoint,
            session,
            sftp: Some(sftp),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Close the SFTP channel and disconnect; idempotent
    pub fn close(&mut self) {
        if self.sftp.take().is_some() {
            let _ = self.session.disconnect(None, "Closing connection", None);
            debug!(endpoint = %self.endpoint, "SFTP session closed");
        }
    }

    fn sftp(&self, path: &str) -> ferry_core_interface::Result<&Sftp> {
        self.sftp.as_ref().ok_or_else(|| RemoteFsError::Protocol {
            path: path.to_string(),
            message: "session is closed".to_string(),
        })
    }
}

impl Drop for SftpSession {
    fn drop(&mut self) {
        self.close();
    }
}

fn set_setup_timeout(session: &Session, timeout: Duration) {
    session.set_timeout(u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX));
}

/// Zero means blocking calls wait indefinitely
fn clear_timeout(session: &Session) {
    session.set_timeout(0);
}

fn authenticate(session: &Session, username: &str, auth: &SshAuth) -> Result<()> {
    match auth {
        SshAuth::Password(password) => password_auth(session, username, password),
        SshAuth::KeyFile {
            key_path,
            passphrase,
            fallback_password,
        } => {
            let key_result = if key_path.exists() {
                let pass: Option<&str> = passphrase.as_ref().map(|p| p.expose_secret());
                session
                    .userauth_pubkey_file(username, None, key_path, pass)
                    .map_err(|e| format!("Key file authentication failed: {}", e))
            } else {
                Err(format!("Private key not found: {}", key_path.display()))
            };

            match (key_result, fallback_password) {
                (Ok(()), _) => Ok(()),
                (Err(reason), Some(password)) => {
                    warn!("{}; falling back to password authentication", reason);
                    password_auth(session, username, password)
                }
                (Err(reason), None) => Err(FerryError::Authentication(reason)),
            }
        }
    }
}

fn password_auth(session: &Session, username: &str, password: &SecretString) -> Result<()> {
    session
        .userauth_password(username, password.expose_secret())
        .map_err(|e| FerryError::Authentication(format!("Password authentication failed: {}", e)))
}

fn map_ssh_error(path: &str, err: ssh2::Error) -> RemoteFsError {
    match err.code() {
        ErrorCode::SFTP(FX_NO_SUCH_FILE) => RemoteFsError::NotFound(path.to_string()),
        ErrorCode::SFTP(FX_PERMISSION_DENIED) => RemoteFsError::PermissionDenied(path.to_string()),
        _ => RemoteFsError::Protocol {
            path: path.to_string(),
            message: err.message().to_string(),
        },
    }
}

fn to_metadata(stat: &ssh2::FileStat) -> RemoteMetadata {
    if stat.is_dir() {
        RemoteMetadata::directory()
    } else {
        RemoteMetadata::file(stat.size.unwrap_or(0))
    }
}

impl RemoteFs for SftpSession {
    fn stat(&self, path: &str) -> ferry_core_interface::Result<RemoteMetadata> {
        let stat = self
            .sftp(path)?
            .stat(Path::new(path))
            .map_err(|e| map_ssh_error(path, e))?;
        Ok(to_metadata(&stat))
    }

    fn list_dir(&self, path: &str) -> ferry_core_interface::Result<Vec<RemoteEntry>> {
        let listing = self
            .sftp(path)?
            .readdir(Path::new(path))
            .map_err(|e| map_ssh_error(path, e))?;

        Ok(listing
            .into_iter()
            .filter_map(|(child, stat)| {
                let name = child.file_name()?.to_string_lossy().into_owned();
                Some(RemoteEntry::new(name, to_metadata(&stat)))
            })
            .collect())
    }

    fn open_read(&self, path: &str) -> ferry_core_interface::Result<Box<dyn Read + '_>> {
        let file = self
            .sftp(path)?
            .open(Path::new(path))
            .map_err(|e| map_ssh_error(path, e))?;
        Ok(Box::new(file))
    }
}
