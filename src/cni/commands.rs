//! Lifecycle Orchestrator: the three CNI commands.
//!
//! ADD is transactional from the runtime's point of view: if anything after
//! the daemon reservation fails, the reservation is released again before
//! the error propagates. DEL is best-effort throughout and never fails the
//! runtime. CHECK hard-fails on drift.

use tracing::warn;

use crate::api::{AddRequest, CheckRequest, DelRequest};
use crate::config::PluginConf;
use crate::error::{Error, Result};

use super::daemon_client::DaemonClient;
use super::{delegate, CmdArgs};

/// ADD: reserve a port, delegate interface wiring, return the delegate's
/// result verbatim.
pub async fn cmd_add(args: &CmdArgs) -> Result<Vec<u8>> {
    let conf = PluginConf::parse(&args.stdin_data)?;
    let client = DaemonClient::new(conf.socket_path());

    let lease = client
        .add(&AddRequest {
            container_id: args.container_id.clone(),
            network_id: conf.network_id.clone(),
            subnet_id: conf.subnet_id.clone(),
        })
        .await?;

    // From here on the reservation exists; release it on any failure.
    let document = match conf.delegate_document(&lease) {
        Ok(document) => document,
        Err(err) => {
            release_reservation(&client, args, &conf).await;
            return Err(err);
        }
    };

    match delegate::invoke(&conf.delegate_plugin, "ADD", &document, args).await {
        Ok(output) => Ok(output),
        Err(err) => {
            release_reservation(&client, args, &conf).await;
            Err(err)
        }
    }
}

/// Compensation for a failed ADD. Its own failure is logged, never
/// propagated: it must not mask the original error.
async fn release_reservation(client: &DaemonClient, args: &CmdArgs, conf: &PluginConf) {
    let request = DelRequest {
        container_id: args.container_id.clone(),
        network_id: conf.network_id.clone(),
    };
    if let Err(err) = client.del(&request).await {
        warn!(%err, container_id = %args.container_id, "failed to release port reservation");
    }
}

/// DEL: tear down the local interface first, then the reservation. Every
/// step is best-effort; the command itself always succeeds.
pub async fn cmd_del(args: &CmdArgs) -> Result<()> {
    // Without a parsable config there is nothing we can clean up.
    let Ok(conf) = PluginConf::parse(&args.stdin_data) else {
        return Ok(());
    };

    match conf.passthrough_document() {
        Ok(document) => {
            if let Err(err) = delegate::invoke(&conf.delegate_plugin, "DEL", &document, args).await
            {
                warn!(%err, "delegate delete failed, continuing with port cleanup");
            }
        }
        Err(err) => warn!(%err, "failed to build delegate document, continuing with port cleanup"),
    }

    let client = DaemonClient::new(conf.socket_path());
    let request = DelRequest {
        container_id: args.container_id.clone(),
        network_id: conf.network_id.clone(),
    };
    if let Err(err) = client.del(&request).await {
        warn!(%err, container_id = %args.container_id, "daemon delete failed");
    }

    Ok(())
}

/// CHECK: confirm the reservation still exists, then let the delegate
/// verify the local interface.
pub async fn cmd_check(args: &CmdArgs) -> Result<()> {
    let conf = PluginConf::parse(&args.stdin_data)?;
    let client = DaemonClient::new(conf.socket_path());

    let response = client
        .check(&CheckRequest {
            container_id: args.container_id.clone(),
            network_id: conf.network_id.clone(),
        })
        .await?;
    if !response.exists {
        return Err(Error::NotFound("neutron port not found".to_string()));
    }

    let document = conf.passthrough_document()?;
    delegate::invoke(&conf.delegate_plugin, "CHECK", &document, args).await?;
    Ok(())
}
