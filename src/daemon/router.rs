//! Request Router: dispatches decoded requests to the Resource Manager.
//!
//! Required fields are validated before any control-plane call; manager
//! failures become 500 responses with the upstream message preserved in
//! the uniform error envelope.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::api::{
    AddRequest, AddResponse, CheckRequest, CheckResponse, DelRequest, DelResponse, ErrorResponse,
};

use super::manager::{ManagerError, PortManager};

/// Shared state handed to every handler.
pub struct AppState {
    pub manager: PortManager,
}

/// Build the daemon's API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/add", post(add))
        .route("/del", post(del))
        .route("/check", post(check))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Error envelope with an HTTP status.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<ManagerError> for ApiError {
    fn from(err: ManagerError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

fn decoded<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(request)| request)
        .map_err(|err| ApiError::bad_request(format!("invalid request body: {err}")))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

async fn add(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AddRequest>, JsonRejection>,
) -> Result<Json<AddResponse>, ApiError> {
    let request = decoded(payload)?;
    if request.container_id.is_empty()
        || request.network_id.is_empty()
        || request.subnet_id.is_empty()
    {
        return Err(ApiError::bad_request(
            "container_id, network_id, and subnet_id are required",
        ));
    }
    info!(
        container_id = %request.container_id,
        network_id = %request.network_id,
        subnet_id = %request.subnet_id,
        "add request"
    );

    let lease = state
        .manager
        .attach(
            &request.container_id,
            &request.network_id,
            &request.subnet_id,
        )
        .await
        .map_err(|err| {
            error!(%err, container_id = %request.container_id, "add failed");
            ApiError::from(err)
        })?;

    info!(
        port_id = %lease.port_id,
        mac = %lease.mac_address,
        ip = %lease.ip_address,
        "add complete"
    );
    Ok(Json(AddResponse {
        port_id: lease.port_id,
        mac_address: lease.mac_address,
        ip_address: lease.ip_address,
        prefix_length: lease.prefix_length,
        gateway_ip: lease.gateway_ip,
    }))
}

async fn del(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DelRequest>, JsonRejection>,
) -> Result<Json<DelResponse>, ApiError> {
    let request = decoded(payload)?;
    if request.container_id.is_empty() || request.network_id.is_empty() {
        return Err(ApiError::bad_request(
            "container_id and network_id are required",
        ));
    }
    info!(
        container_id = %request.container_id,
        network_id = %request.network_id,
        "del request"
    );

    state
        .manager
        .detach(&request.container_id, &request.network_id)
        .await
        .map_err(|err| {
            error!(%err, container_id = %request.container_id, "del failed");
            ApiError::from(err)
        })?;

    Ok(Json(DelResponse { ok: true }))
}

async fn check(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CheckRequest>, JsonRejection>,
) -> Result<Json<CheckResponse>, ApiError> {
    let request = decoded(payload)?;
    if request.container_id.is_empty() || request.network_id.is_empty() {
        return Err(ApiError::bad_request(
            "container_id and network_id are required",
        ));
    }
    info!(
        container_id = %request.container_id,
        network_id = %request.network_id,
        "check request"
    );

    let exists = state
        .manager
        .verify(&request.container_id, &request.network_id)
        .await
        .map_err(|err| {
            error!(%err, container_id = %request.container_id, "check failed");
            ApiError::from(err)
        })?;

    info!(exists, "check complete");
    Ok(Json(CheckResponse { exists }))
}
