//! # openstack-port
//!
//! CNI glue for OpenStack Neutron, split into a thick daemon and a thin
//! per-invocation CNI plugin.
//!
//! The daemon holds the OpenStack credentials, listens on a root-only Unix
//! socket and reserves/releases Neutron ports on behalf of the plugin. The
//! plugin is invoked once per container lifecycle event: it asks the daemon
//! for a port lease, then delegates the actual interface wiring to a second
//! CNI plugin (e.g. `ovs`) with the leased address injected as static IPAM
//! configuration.

pub mod api;
pub mod cni;
pub mod config;
pub mod daemon;
pub mod error;
pub mod logging;
pub mod neutron;

pub use error::{Error, Result};
