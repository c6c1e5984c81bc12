//! Shared request/response types for the plugin ↔ daemon exchange.
//!
//! One HTTP exchange per connection over the Unix socket. Field names are
//! fixed wire identifiers and must round-trip byte-for-byte; any non-2xx
//! response carries [`ErrorResponse`].

use serde::{Deserialize, Serialize};

/// Default Unix domain socket path for the daemon.
pub const DEFAULT_SOCKET_PATH: &str = "/var/run/openstack-cni/cni.sock";

/// Sent by the plugin to reserve a Neutron port (`POST /add`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddRequest {
    pub container_id: String,
    pub network_id: String,
    pub subnet_id: String,
}

/// Port details needed for the delegated plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddResponse {
    pub port_id: String,
    pub mac_address: String,
    pub ip_address: String,
    pub prefix_length: String,
    pub gateway_ip: String,
}

/// Sent by the plugin to release a Neutron port (`POST /del`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelRequest {
    pub container_id: String,
    pub network_id: String,
}

/// Acknowledges a delete. Delete is idempotent: already-gone is still `ok`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelResponse {
    pub ok: bool,
}

/// Sent by the plugin to verify a Neutron port exists (`POST /check`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckRequest {
    pub container_id: String,
    pub network_id: String,
}

/// Reports whether at least one matching port exists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckResponse {
    pub exists: bool,
}

/// Uniform error envelope returned on any non-2xx response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorResponse {
    pub error: String,
}
