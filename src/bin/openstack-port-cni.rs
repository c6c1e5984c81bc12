//! The thin CNI plugin: one process per lifecycle event, driven by the
//! `CNI_*` environment and the configuration document on stdin.

use openstack_port::{cni, logging};

#[tokio::main]
async fn main() {
    logging::init("warn");
    let code = cni::run().await;
    std::process::exit(code);
}
