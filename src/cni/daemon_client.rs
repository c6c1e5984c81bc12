//! HTTP client for the daemon socket.
//!
//! One request/response exchange per connection, as the daemon expects.
//! Transport failures (socket absent, connection refused or reset) map to
//! [`Error::DaemonUnreachable`]; non-2xx responses are reported through the
//! error envelope, falling back to the raw status and body when the
//! envelope is absent or malformed.

use std::path::{Path, PathBuf};

use http::{header, Method, Request};
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::net::UnixStream;
use tracing::debug;

use crate::api::{
    AddRequest, AddResponse, CheckRequest, CheckResponse, DelRequest, DelResponse, ErrorResponse,
};
use crate::error::{Error, Result};

/// Client for one daemon socket.
pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    pub fn new(socket_path: impl AsRef<Path>) -> Self {
        Self {
            socket_path: socket_path.as_ref().to_path_buf(),
        }
    }

    pub async fn add(&self, request: &AddRequest) -> Result<AddResponse> {
        self.request(Method::POST, "/add", request).await
    }

    pub async fn del(&self, request: &DelRequest) -> Result<DelResponse> {
        self.request(Method::POST, "/del", request).await
    }

    pub async fn check(&self, request: &CheckRequest) -> Result<CheckResponse> {
        self.request(Method::POST, "/check", request).await
    }

    async fn request<Req, Resp>(&self, method: Method, path: &str, body: &Req) -> Result<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let payload = serde_json::to_vec(body)?;
        debug!(socket = %self.socket_path.display(), %path, "daemon request");

        let stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|err| Error::DaemonUnreachable(err.to_string()))?;
        let (mut sender, connection) =
            http1::handshake::<_, Full<Bytes>>(TokioIo::new(stream))
                .await
                .map_err(|err| Error::DaemonUnreachable(err.to_string()))?;
        tokio::spawn(async move {
            if let Err(err) = connection.await {
                debug!(%err, "daemon connection closed");
            }
        });

        let request = Request::builder()
            .method(method)
            .uri(path)
            .header(header::HOST, "localhost")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(payload)))
            .map_err(|err| Error::Internal(err.to_string()))?;

        let response = sender
            .send_request(request)
            .await
            .map_err(|err| Error::DaemonUnreachable(err.to_string()))?;
        let status = response.status();
        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|err| Error::DaemonUnreachable(err.to_string()))?
            .to_bytes();

        if !status.is_success() {
            if let Ok(envelope) = serde_json::from_slice::<ErrorResponse>(&body) {
                if !envelope.error.is_empty() {
                    return Err(Error::Daemon(envelope.error));
                }
            }
            return Err(Error::DaemonStatus {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        Ok(serde_json::from_slice(&body)?)
    }
}
