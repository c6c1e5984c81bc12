//! The privileged daemon: authenticated socket, router, graceful shutdown.

mod listener;
mod manager;
mod router;

pub use listener::CredListener;
pub use manager::{port_name, ManagerError, PortLease, PortManager, PORT_NAME_PREFIX};
pub use router::{router, AppState};

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::neutron::ControlPlane;

/// Only root may talk to the daemon in production.
pub const ROOT_UID: u32 = 0;

/// Serve the API on `socket_path` until SIGINT/SIGTERM.
///
/// Stops accepting on shutdown, lets in-flight requests finish, then
/// removes the socket file.
pub async fn run(socket_path: &Path, control: Arc<dyn ControlPlane>) -> std::io::Result<()> {
    let state = Arc::new(AppState {
        manager: PortManager::new(control),
    });
    let app = router(state);

    let listener = CredListener::bind(socket_path, ROOT_UID)?;
    info!(socket = %socket_path.display(), "daemon listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Err(err) = std::fs::remove_file(socket_path) {
        if err.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(%err, "failed to remove socket file");
        }
    }
    info!("daemon stopped");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received, draining in-flight requests");
}
