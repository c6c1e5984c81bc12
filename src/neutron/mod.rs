//! OpenStack Neutron boundary.
//!
//! The daemon talks to the control plane through the [`ControlPlane`] trait
//! so tests can substitute an in-memory double; [`NeutronClient`] is the
//! real implementation against the Neutron v2.0 REST API.

pub mod auth;
mod client;

pub use auth::AuthOptions;
pub use client::NeutronClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the control-plane boundary
#[derive(Debug, Error)]
pub enum NeutronError {
    /// A required OS_* variable is absent
    #[error("missing environment variable {0}")]
    MissingEnv(&'static str),

    /// Keystone rejected the credentials or returned an unusable catalog
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The HTTP request itself failed (connect, timeout, decode)
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Neutron answered with an error status
    #[error("neutron returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The referenced entity does not exist
    #[error("not found: {0}")]
    NotFound(String),
}

/// A Neutron port as returned by create/list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Port {
    pub id: String,
    pub name: String,
    pub mac_address: String,
    pub network_id: String,
    pub fixed_ips: Vec<FixedIp>,
}

/// One address assignment on a port.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixedIp {
    pub subnet_id: String,
    pub ip_address: String,
}

/// A Neutron subnet (read-only to this system).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Subnet {
    pub id: String,
    pub network_id: String,
    pub cidr: String,
    pub gateway_ip: String,
}

/// Port-creation request: name the port and fix it to one subnet.
#[derive(Debug, Clone, Serialize)]
pub struct PortCreate {
    pub name: String,
    pub network_id: String,
    pub fixed_ips: Vec<FixedIpRequest>,
}

/// Fixed-ip entry for [`PortCreate`]; the address is chosen by Neutron.
#[derive(Debug, Clone, Serialize)]
pub struct FixedIpRequest {
    pub subnet_id: String,
}

/// The daemon's view of the network control plane.
///
/// Implementations must be safe to share across concurrently served
/// requests; every call is independent and carries no session state.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn create_port(&self, create: &PortCreate) -> Result<Port, NeutronError>;

    /// List ports filtered by exact name and owning network.
    async fn list_ports(&self, name: &str, network_id: &str) -> Result<Vec<Port>, NeutronError>;

    /// Delete a port. A port that is already gone yields
    /// [`NeutronError::NotFound`]; callers decide whether that matters.
    async fn delete_port(&self, port_id: &str) -> Result<(), NeutronError>;

    async fn get_subnet(&self, subnet_id: &str) -> Result<Subnet, NeutronError>;
}
