//! Client-facing configuration document.
//!
//! The orchestrator reads one JSON document from stdin per invocation. Four
//! fields belong to this plugin; everything else is the delegated plugin's
//! own configuration and is passed through untouched, except for the
//! identity and static-address fields injected after a successful attach.

use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::api::{AddResponse, DEFAULT_SOCKET_PATH};
use crate::error::{Error, Result};

/// Configuration for the openstack-port wrapper plugin.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PluginConf {
    #[serde(default)]
    pub network_id: String,
    #[serde(default)]
    pub subnet_id: String,
    /// Name of the second plugin to invoke, e.g. "ovs".
    #[serde(default)]
    pub delegate_plugin: String,
    /// Optional override of the daemon socket path.
    #[serde(default)]
    pub socket_path: Option<String>,
    /// Everything the delegated plugin owns, passed through unmodified.
    #[serde(flatten)]
    pub passthrough: Map<String, Value>,
}

impl PluginConf {
    /// Parse the stdin document.
    pub fn parse(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data)
            .map_err(|err| Error::Config(format!("failed to parse network config: {err}")))
    }

    /// The daemon socket path: configured override or the default.
    pub fn socket_path(&self) -> &str {
        self.socket_path.as_deref().unwrap_or(DEFAULT_SOCKET_PATH)
    }

    /// The pass-through document as handed to the delegate for DEL/CHECK.
    pub fn passthrough_document(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.passthrough)?)
    }

    /// Assemble the delegate's ADD document: pass-through fields plus the
    /// leased port identity under `args.cni` and a static IPAM block.
    ///
    /// Fails if an existing `args` or `args.cni` entry is not an object;
    /// the caller is expected to release the lease on failure.
    pub fn delegate_document(&self, lease: &AddResponse) -> Result<Vec<u8>> {
        let mut doc = self.passthrough.clone();

        let args = doc
            .entry("args".to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        let args = args
            .as_object_mut()
            .ok_or_else(|| Error::Config("\"args\" in network config is not an object".to_string()))?;
        let cni = args
            .entry("cni".to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        let cni = cni.as_object_mut().ok_or_else(|| {
            Error::Config("\"args.cni\" in network config is not an object".to_string())
        })?;
        cni.insert("ovnPort".to_string(), Value::String(lease.port_id.clone()));
        cni.insert("mac".to_string(), Value::String(lease.mac_address.clone()));

        doc.insert(
            "ipam".to_string(),
            json!({
                "type": "static",
                "addresses": [{
                    "address": format!("{}/{}", lease.ip_address, lease.prefix_length),
                    "gateway": lease.gateway_ip,
                }],
            }),
        );

        Ok(serde_json::to_vec(&Value::Object(doc))?)
    }
}
