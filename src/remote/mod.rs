/*!
 * Remote session backends for the mirror job
 *
 * - `local`: a locally mounted tree, always available
 * - `sftp`: SSH/SFTP via ssh2 (requires the `ssh-backend` feature)
 */

pub mod local;

#[cfg(feature = "ssh-backend")]
pub mod sftp;

pub use local::LocalRemote;

#[cfg(feature = "ssh-backend")]
pub use sftp::{SftpSession, SshAuth};

use std::io::Read;
use tracing::info;

use ferry_core_interface::{RemoteEntry, RemoteFs, RemoteMetadata};

use crate::config::{MirrorBackend, MirrorConfig};
use crate::error::Result;

/// Session acquired for one mirror run
///
/// Dropping the session releases it, so every exit path of a run closes the
/// connection.
pub enum MirrorSession {
    Local(LocalRemote),

    #[cfg(feature = "ssh-backend")]
    Sftp(SftpSession),
}

impl MirrorSession {
    /// Open the session selected by `settings.backend`
    pub fn open(settings: &MirrorConfig) -> Result<Self> {
        match settings.backend {
            MirrorBackend::Local => {
                info!(root = %settings.source_root.display(), "Using local mirror source");
                Ok(MirrorSession::Local(LocalRemote::new(&settings.source_root)))
            }
            #[cfg(feature = "ssh-backend")]
            MirrorBackend::Sftp => SftpSession::connect(settings).map(MirrorSession::Sftp),
            #[cfg(not(feature = "ssh-backend"))]
            MirrorBackend::Sftp => Err(crate::error::FerryError::Config(
                "SFTP backend support not compiled in. Rebuild with --features ssh-backend"
                    .to_string(),
            )),
        }
    }

    pub fn backend(&self) -> MirrorBackend {
        match self {
            MirrorSession::Local(_) => MirrorBackend::Local,
            #[cfg(feature = "ssh-backend")]
            MirrorSession::Sftp(_) => MirrorBackend::Sftp,
        }
    }

    fn inner(&self) -> &dyn RemoteFs {
        match self {
            MirrorSession::Local(local) => local,
            #[cfg(feature = "ssh-backend")]
            MirrorSession::Sftp(sftp) => sftp,
        }
    }
}

impl RemoteFs for MirrorSession {
    fn stat(&self, path: &str) -> ferry_core_interface::Result<RemoteMetadata> {
        self.inner().stat(path)
    }

    fn list_dir(&self, path: &str) -> ferry_core_interface::Result<Vec<RemoteEntry>> {
        self.inner().list_dir(path)
    }

    fn open_read(&self, path: &str) -> ferry_core_interface::Result<Box<dyn Read + '_>> {
        self.inner().open_read(path)
    }
}
