//! Shared test fixtures: an in-memory control-plane double.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use openstack_port::neutron::{
    ControlPlane, FixedIp, NeutronError, Port, PortCreate, Subnet,
};

/// In-memory Neutron: ports live in a vec, subnets are seeded by the test,
/// failures are injected through flags.
#[derive(Default)]
pub struct FakeNeutron {
    pub ports: Mutex<Vec<Port>>,
    pub subnets: Mutex<Vec<Subnet>>,
    pub fail_create: AtomicBool,
    pub fail_subnet_get: AtomicBool,
    pub fail_delete: AtomicBool,
    /// When set, created ports get their address on a foreign subnet.
    pub assign_foreign_subnet: AtomicBool,
    pub delete_calls: AtomicUsize,
    next_port: AtomicUsize,
}

impl FakeNeutron {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fake seeded with the scenario-A subnet `10.0.0.0/24`.
    pub fn with_default_subnet() -> Self {
        let fake = Self::new();
        fake.add_subnet(Subnet {
            id: "sub-1".to_string(),
            network_id: "net-1".to_string(),
            cidr: "10.0.0.0/24".to_string(),
            gateway_ip: "10.0.0.1".to_string(),
        });
        fake
    }

    pub fn add_subnet(&self, subnet: Subnet) {
        self.subnets.lock().unwrap().push(subnet);
    }

    pub fn port_count(&self) -> usize {
        self.ports.lock().unwrap().len()
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    fn next_address(&self) -> (usize, String) {
        let n = self.next_port.fetch_add(1, Ordering::SeqCst);
        (n, format!("10.0.0.{}", 5 + n))
    }
}

#[async_trait]
impl ControlPlane for FakeNeutron {
    async fn create_port(&self, create: &PortCreate) -> Result<Port, NeutronError> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(NeutronError::Api {
                status: 500,
                message: "port quota exceeded".to_string(),
            });
        }
        let (n, address) = self.next_address();
        let fixed_ips = create
            .fixed_ips
            .iter()
            .map(|fixed| FixedIp {
                subnet_id: if self.assign_foreign_subnet.load(Ordering::SeqCst) {
                    "foreign-subnet".to_string()
                } else {
                    fixed.subnet_id.clone()
                },
                ip_address: address.clone(),
            })
            .collect();
        let port = Port {
            id: format!("port-{}", n + 1),
            name: create.name.clone(),
            mac_address: "fa:16:3e:aa:bb:cc".to_string(),
            network_id: create.network_id.clone(),
            fixed_ips,
        };
        self.ports.lock().unwrap().push(port.clone());
        Ok(port)
    }

    async fn list_ports(&self, name: &str, network_id: &str) -> Result<Vec<Port>, NeutronError> {
        Ok(self
            .ports
            .lock()
            .unwrap()
            .iter()
            .filter(|port| port.name == name && port.network_id == network_id)
            .cloned()
            .collect())
    }

    async fn delete_port(&self, port_id: &str) -> Result<(), NeutronError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(NeutronError::Api {
                status: 500,
                message: "port is in use".to_string(),
            });
        }
        let mut ports = self.ports.lock().unwrap();
        let before = ports.len();
        ports.retain(|port| port.id != port_id);
        if ports.len() == before {
            return Err(NeutronError::NotFound(format!("port {port_id}")));
        }
        Ok(())
    }

    async fn get_subnet(&self, subnet_id: &str) -> Result<Subnet, NeutronError> {
        if self.fail_subnet_get.load(Ordering::SeqCst) {
            return Err(NeutronError::Api {
                status: 503,
                message: "subnet service unavailable".to_string(),
            });
        }
        self.subnets
            .lock()
            .unwrap()
            .iter()
            .find(|subnet| subnet.id == subnet_id)
            .cloned()
            .ok_or_else(|| NeutronError::NotFound(format!("subnet {subnet_id}")))
    }
}
