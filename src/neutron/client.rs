//! Reqwest-based Neutron v2.0 client.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::auth::{issue_token, AuthOptions};
use super::{ControlPlane, NeutronError, Port, PortCreate, Subnet};
use async_trait::async_trait;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Authenticated Neutron client, constructed once at daemon startup and
/// shared read-only across all served requests.
pub struct NeutronClient {
    http: reqwest::Client,
    endpoint: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct PortEnvelope {
    port: Port,
}

#[derive(Debug, Deserialize)]
struct PortListEnvelope {
    #[serde(default)]
    ports: Vec<Port>,
}

#[derive(Debug, Deserialize)]
struct SubnetEnvelope {
    subnet: Subnet,
}

impl NeutronClient {
    /// Authenticate against Keystone and resolve the network endpoint.
    pub async fn authenticate(options: AuthOptions) -> Result<Self, NeutronError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let (token, endpoint) = issue_token(&http, &options).await?;
        debug!(%endpoint, "neutron endpoint resolved");
        Ok(Self {
            http,
            endpoint,
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.endpoint)
    }

    /// Turn a non-2xx Neutron response into an [`NeutronError::Api`],
    /// keeping the upstream message when the body carries one.
    async fn api_error(response: reqwest::Response) -> NeutronError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|value| {
                value
                    .get("NeutronError")
                    .and_then(|err| err.get("message"))
                    .and_then(Value::as_str)
                    .map(str::to_owned)
            })
            .unwrap_or_else(|| body.trim().to_string());
        NeutronError::Api { status, message }
    }
}

#[async_trait]
impl ControlPlane for NeutronClient {
    async fn create_port(&self, create: &PortCreate) -> Result<Port, NeutronError> {
        let response = self
            .http
            .post(self.url("/v2.0/ports"))
            .header("X-Auth-Token", &self.token)
            .json(&json!({ "port": create }))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        let envelope: PortEnvelope = response.json().await?;
        Ok(envelope.port)
    }

    async fn list_ports(&self, name: &str, network_id: &str) -> Result<Vec<Port>, NeutronError> {
        let response = self
            .http
            .get(self.url("/v2.0/ports"))
            .header("X-Auth-Token", &self.token)
            .query(&[("name", name), ("network_id", network_id)])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        let envelope: PortListEnvelope = response.json().await?;
        Ok(envelope.ports)
    }

    async fn delete_port(&self, port_id: &str) -> Result<(), NeutronError> {
        let response = self
            .http
            .delete(self.url(&format!("/v2.0/ports/{port_id}")))
            .header("X-Auth-Token", &self.token)
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(NeutronError::NotFound(format!("port {port_id}")));
        }
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        Ok(())
    }

    async fn get_subnet(&self, subnet_id: &str) -> Result<Subnet, NeutronError> {
        let response = self
            .http
            .get(self.url(&format!("/v2.0/subnets/{subnet_id}")))
            .header("X-Auth-Token", &self.token)
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(NeutronError::NotFound(format!("subnet {subnet_id}")));
        }
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }
        let envelope: SubnetEnvelope = response.json().await?;
        Ok(envelope.subnet)
    }
}
