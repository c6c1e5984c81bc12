//! Authenticated Unix-socket listener.
//!
//! This is the sole authorization boundary in front of the daemon's
//! OpenStack credentials: a connecting peer is identified through
//! `SO_PEERCRED` and dropped before any HTTP handshake unless its uid
//! matches the required uid. The wrapper satisfies the same accept contract
//! as the underlying listener, so the server code above it never sees an
//! unauthorized connection.

use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use axum::serve::Listener;
use tokio::net::{unix::SocketAddr, UnixListener, UnixStream};
use tracing::{debug, warn};

/// Unix listener that only yields connections from one uid.
pub struct CredListener {
    inner: UnixListener,
    required_uid: u32,
}

impl CredListener {
    /// Bind the socket at `path`, replacing a stale socket file, and
    /// restrict it to owner/group access (0660).
    pub fn bind(path: &Path, required_uid: u32) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        match std::fs::remove_file(path) {
            Ok(()) => debug!(socket = %path.display(), "removed stale socket"),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(err),
        }
        let inner = UnixListener::bind(path)?;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o660))?;
        Ok(Self {
            inner,
            required_uid,
        })
    }

    /// The socket path this listener is bound to, when resolvable.
    pub fn path(&self) -> Option<PathBuf> {
        self.inner
            .local_addr()
            .ok()
            .and_then(|addr| addr.as_pathname().map(Path::to_path_buf))
    }
}

impl Listener for CredListener {
    type Io = UnixStream;
    type Addr = SocketAddr;

    async fn accept(&mut self) -> (Self::Io, Self::Addr) {
        loop {
            match self.inner.accept().await {
                Ok((stream, addr)) => match stream.peer_cred() {
                    Ok(cred) if cred.uid() == self.required_uid => return (stream, addr),
                    Ok(cred) => {
                        // Dropped before any request is read; connection-level
                        // trace only, never an application log line.
                        debug!(uid = cred.uid(), "rejected unauthorized unix peer");
                    }
                    Err(err) => {
                        debug!(%err, "failed to read peer credentials, dropping connection");
                    }
                },
                Err(err) => {
                    warn!(%err, "accept failed, retrying");
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
            }
        }
    }

    fn local_addr(&self) -> io::Result<Self::Addr> {
        self.inner.local_addr()
    }
}
