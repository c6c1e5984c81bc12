//! Resource Manager: the port-lifecycle state machine.
//!
//! Stateless between invocations: every operation re-derives the
//! deterministic port name from the container identity and re-queries the
//! control plane, so a daemon restart loses nothing.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::neutron::{ControlPlane, FixedIpRequest, NeutronError, PortCreate};

/// Prefix of every port this system owns.
pub const PORT_NAME_PREFIX: &str = "k8s-pod-";

/// Derive the deterministic Neutron port name for a container.
///
/// The container identity is truncated to its first 12 characters; shorter
/// identities are used unmodified. The same identity always derives the
/// same name, which makes lookup idempotent without stored state.
pub fn port_name(container_id: &str) -> String {
    let id = container_id.get(..12).unwrap_or(container_id);
    format!("{PORT_NAME_PREFIX}{id}")
}

/// Prefix length as text: everything after the `/` in a CIDR.
fn prefix_length(cidr: &str) -> &str {
    cidr.split_once('/').map(|(_, prefix)| prefix).unwrap_or("")
}

/// What attach hands back for delegation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortLease {
    pub port_id: String,
    pub mac_address: String,
    pub ip_address: String,
    pub prefix_length: String,
    pub gateway_ip: String,
}

/// Resource-manager failures, each naming the failing phase.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("failed to {op}: {source}")]
    ControlPlane {
        op: &'static str,
        #[source]
        source: NeutronError,
    },

    #[error("failed to delete port {port_id}: {source}")]
    DeletePort {
        port_id: String,
        #[source]
        source: NeutronError,
    },

    #[error("port {port_id} was created but has no address on subnet {subnet_id}")]
    NoAddressOnSubnet { port_id: String, subnet_id: String },
}

impl ManagerError {
    fn control_plane(op: &'static str, source: NeutronError) -> Self {
        Self::ControlPlane { op, source }
    }
}

/// Owns the lifecycle-key → port mapping against the control plane.
pub struct PortManager {
    control: Arc<dyn ControlPlane>,
}

impl PortManager {
    pub fn new(control: Arc<dyn ControlPlane>) -> Self {
        Self { control }
    }

    /// Reserve a port on `network_id`, fixed to `subnet_id`.
    ///
    /// All-or-nothing: if the subnet lookup fails after the port was
    /// created, or the port carries no address on the requested subnet,
    /// the port is deleted again before the error is returned.
    pub async fn attach(
        &self,
        container_id: &str,
        network_id: &str,
        subnet_id: &str,
    ) -> Result<PortLease, ManagerError> {
        let name = port_name(container_id);
        let create = PortCreate {
            name: name.clone(),
            network_id: network_id.to_string(),
            fixed_ips: vec![FixedIpRequest {
                subnet_id: subnet_id.to_string(),
            }],
        };
        let port = self
            .control
            .create_port(&create)
            .await
            .map_err(|err| ManagerError::control_plane("create port", err))?;
        debug!(port_id = %port.id, %name, "port created");

        let subnet = match self.control.get_subnet(subnet_id).await {
            Ok(subnet) => subnet,
            Err(err) => {
                self.roll_back(&port.id).await;
                return Err(ManagerError::control_plane("get subnet", err));
            }
        };

        let address = port
            .fixed_ips
            .iter()
            .find(|fixed| fixed.subnet_id == subnet_id)
            .map(|fixed| fixed.ip_address.clone());
        let Some(ip_address) = address else {
            self.roll_back(&port.id).await;
            return Err(ManagerError::NoAddressOnSubnet {
                port_id: port.id,
                subnet_id: subnet_id.to_string(),
            });
        };

        Ok(PortLease {
            port_id: port.id,
            mac_address: port.mac_address,
            ip_address,
            prefix_length: prefix_length(&subnet.cidr).to_string(),
            gateway_ip: subnet.gateway_ip,
        })
    }

    /// Release every port matching the lifecycle key. Already-gone ports
    /// count as released; any other delete failure aborts and is surfaced.
    pub async fn detach(&self, container_id: &str, network_id: &str) -> Result<(), ManagerError> {
        let name = port_name(container_id);
        let ports = self
            .control
            .list_ports(&name, network_id)
            .await
            .map_err(|err| ManagerError::control_plane("list ports", err))?;
        for port in ports {
            match self.control.delete_port(&port.id).await {
                Ok(()) => info!(port_id = %port.id, "deleted port"),
                Err(NeutronError::NotFound(_)) => {
                    debug!(port_id = %port.id, "port already gone");
                }
                Err(err) => {
                    return Err(ManagerError::DeletePort {
                        port_id: port.id,
                        source: err,
                    });
                }
            }
        }
        Ok(())
    }

    /// Whether at least one port matches the lifecycle key.
    pub async fn verify(&self, container_id: &str, network_id: &str) -> Result<bool, ManagerError> {
        let name = port_name(container_id);
        let ports = self
            .control
            .list_ports(&name, network_id)
            .await
            .map_err(|err| ManagerError::control_plane("list ports", err))?;
        Ok(!ports.is_empty())
    }

    /// Compensation for a failed attach. A failed rollback must not mask
    /// the original failure, so errors are logged and swallowed here.
    async fn roll_back(&self, port_id: &str) {
        match self.control.delete_port(port_id).await {
            Ok(()) | Err(NeutronError::NotFound(_)) => {
                debug!(port_id, "rolled back port after failed attach");
            }
            Err(err) => warn!(port_id, %err, "failed to roll back port"),
        }
    }
}
