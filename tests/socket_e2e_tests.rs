//! End-to-end exchanges over a real Unix socket: client ↔ authenticated
//! listener ↔ router ↔ fake control plane.

mod common;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use tokio::net::UnixStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use common::FakeNeutron;
use openstack_port::api::{AddRequest, CheckRequest, DelRequest};
use openstack_port::cni::daemon_client::DaemonClient;
use openstack_port::daemon::{router, AppState, CredListener, PortManager};
use openstack_port::neutron::ControlPlane;

fn current_uid() -> u32 {
    let (left, _right) = UnixStream::pair().unwrap();
    left.peer_cred().unwrap().uid()
}

fn app(fake: &Arc<FakeNeutron>) -> Router {
    router(Arc::new(AppState {
        manager: PortManager::new(Arc::clone(fake) as Arc<dyn ControlPlane>),
    }))
}

struct TestDaemon {
    socket_path: PathBuf,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
    _dir: tempfile::TempDir,
}

impl TestDaemon {
    /// Serve `app` on a fresh socket; only peers with `required_uid` pass.
    fn start(app: Router, required_uid: u32) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("cni.sock");
        let listener = CredListener::bind(&socket_path, required_uid).unwrap();
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = rx.await;
                })
                .await
                .unwrap();
        });
        Self {
            socket_path,
            shutdown: Some(tx),
            handle,
            _dir: dir,
        }
    }

    fn client(&self) -> DaemonClient {
        DaemonClient::new(&self.socket_path)
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = self.handle.await;
    }
}

#[tokio::test]
async fn test_add_end_to_end() {
    let fake = Arc::new(FakeNeutron::with_default_subnet());
    let daemon = TestDaemon::start(app(&fake), current_uid());

    let response = daemon
        .client()
        .add(&AddRequest {
            container_id: "abcdef1234567890".to_string(),
            network_id: "net-1".to_string(),
            subnet_id: "sub-1".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(response.ip_address, "10.0.0.5");
    assert_eq!(response.prefix_length, "24");
    assert_eq!(response.gateway_ip, "10.0.0.1");
    assert_eq!(response.mac_address, "fa:16:3e:aa:bb:cc");
    daemon.stop().await;
}

#[tokio::test]
async fn test_del_with_no_matches_is_ok_without_deletes() {
    let fake = Arc::new(FakeNeutron::new());
    let daemon = TestDaemon::start(app(&fake), current_uid());

    let response = daemon
        .client()
        .del(&DelRequest {
            container_id: "never-attached".to_string(),
            network_id: "net-1".to_string(),
        })
        .await
        .unwrap();

    assert!(response.ok);
    assert_eq!(fake.delete_calls(), 0);
    daemon.stop().await;
}

#[tokio::test]
async fn test_check_reports_absence() {
    let fake = Arc::new(FakeNeutron::new());
    let daemon = TestDaemon::start(app(&fake), current_uid());

    let response = daemon
        .client()
        .check(&CheckRequest {
            container_id: "never-attached".to_string(),
            network_id: "net-1".to_string(),
        })
        .await
        .unwrap();

    assert!(!response.exists);
    daemon.stop().await;
}

#[tokio::test]
async fn test_validation_error_travels_through_envelope() {
    let fake = Arc::new(FakeNeutron::new());
    let daemon = TestDaemon::start(app(&fake), current_uid());

    let err = daemon.client().add(&AddRequest::default()).await.unwrap_err();
    let message = err.to_string();
    assert!(message.starts_with("daemon error:"), "got: {message}");
    assert!(message.contains("required"));
    daemon.stop().await;
}

#[tokio::test]
async fn test_unauthorized_peer_is_rejected_before_any_request() {
    let fake = Arc::new(FakeNeutron::with_default_subnet());
    // Require a uid nobody has: every peer is dropped at accept time.
    let daemon = TestDaemon::start(app(&fake), u32::MAX - 1);

    let err = daemon
        .client()
        .add(&AddRequest {
            container_id: "abcdef1234567890".to_string(),
            network_id: "net-1".to_string(),
            subnet_id: "sub-1".to_string(),
        })
        .await
        .unwrap_err();

    assert!(err.to_string().contains("daemon request failed"));
    // No request was processed, so no port was created.
    assert_eq!(fake.port_count(), 0);
    daemon.stop().await;
}

#[tokio::test]
async fn test_absent_socket_is_a_transport_failure() {
    let dir = tempfile::tempdir().unwrap();
    let client = DaemonClient::new(dir.path().join("nonexistent.sock"));

    let err = client.add(&AddRequest::default()).await.unwrap_err();
    assert!(err.to_string().contains("daemon request failed"));
}
