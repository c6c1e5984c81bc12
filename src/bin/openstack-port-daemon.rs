//! The thick daemon: holds the OpenStack credentials and reserves Neutron
//! ports for the thin CNI plugin over a root-only Unix socket.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use openstack_port::api::DEFAULT_SOCKET_PATH;
use openstack_port::neutron::{auth, AuthOptions, NeutronClient};
use openstack_port::{daemon, logging};

#[derive(Parser, Debug)]
#[command(
    name = "openstack-port-daemon",
    about = "Reserves OpenStack Neutron ports for CNI attachments",
    version
)]
struct Args {
    /// Unix socket path to listen on.
    #[arg(long, env = "OSP_SOCKET_PATH", default_value = DEFAULT_SOCKET_PATH)]
    socket_path: PathBuf,

    /// Optional KEY=VALUE file loaded into the environment before the
    /// OS_* variables are read.
    #[arg(long)]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init("info");
    let args = Args::parse();

    if let Some(path) = &args.env_file {
        auth::load_env_file(path)
            .with_context(|| format!("failed to load env file {}", path.display()))?;
    }

    let options = AuthOptions::from_env().context("failed to read OS_* environment")?;
    info!(auth_url = %options.auth_url, "authenticating with OpenStack");
    let client = NeutronClient::authenticate(options)
        .await
        .context("failed to authenticate with OpenStack")?;
    info!("authentication successful, Neutron client ready");

    daemon::run(&args.socket_path, Arc::new(client))
        .await
        .context("daemon server error")?;
    Ok(())
}
