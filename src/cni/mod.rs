//! CNI entry point: environment contract, dispatch, result/error output.
//!
//! A CNI runtime invokes the plugin once per lifecycle event with the
//! command in `CNI_COMMAND`, call details in further `CNI_*` variables and
//! the network configuration document on stdin. Results and errors are
//! JSON on stdout; the exit code signals success.

pub mod commands;
pub mod daemon_client;
pub mod delegate;

use std::io::{Read, Write};

use serde::Serialize;
use serde_json::json;
use tracing::error;

use crate::error::Error;

/// CNI spec versions this plugin answers for.
pub const SUPPORTED_VERSIONS: &[&str] = &["0.3.0", "0.3.1", "0.4.0", "1.0.0"];

const CNI_VERSION: &str = "1.0.0";

/// Well-known CNI error codes (the subset this plugin emits).
const ERR_INVALID_ENVIRONMENT: u32 = 4;
const ERR_DECODING_FAILURE: u32 = 6;
const ERR_OPERATION_FAILED: u32 = 100;

/// Per-invocation call details from the `CNI_*` environment.
#[derive(Debug, Clone, Default)]
pub struct CmdArgs {
    pub container_id: String,
    pub netns: String,
    pub ifname: String,
    pub args: String,
    pub path: String,
    pub stdin_data: Vec<u8>,
}

impl CmdArgs {
    /// Collect the environment and the stdin document.
    pub fn from_env() -> Result<Self, Error> {
        let container_id = std::env::var("CNI_CONTAINERID")
            .map_err(|_| Error::Config("CNI_CONTAINERID is not set".to_string()))?;
        let mut stdin_data = Vec::new();
        std::io::stdin().read_to_end(&mut stdin_data)?;
        Ok(Self {
            container_id,
            netns: std::env::var("CNI_NETNS").unwrap_or_default(),
            ifname: std::env::var("CNI_IFNAME").unwrap_or_default(),
            args: std::env::var("CNI_ARGS").unwrap_or_default(),
            path: std::env::var("CNI_PATH").unwrap_or_default(),
            stdin_data,
        })
    }
}

#[derive(Serialize)]
struct CniErrorMsg {
    #[serde(rename = "cniVersion")]
    cni_version: &'static str,
    code: u32,
    msg: String,
}

fn error_code(err: &Error) -> u32 {
    match err {
        Error::Json(_) => ERR_DECODING_FAILURE,
        Error::Config(message) if message.contains("CNI_") => ERR_INVALID_ENVIRONMENT,
        Error::Config(_) => ERR_DECODING_FAILURE,
        _ => ERR_OPERATION_FAILED,
    }
}

fn print_error(err: &Error) {
    error!(%err, "command failed");
    let msg = CniErrorMsg {
        cni_version: CNI_VERSION,
        code: error_code(err),
        msg: err.to_string(),
    };
    let encoded = serde_json::to_string(&msg)
        .unwrap_or_else(|_| format!("{{\"code\":{ERR_OPERATION_FAILED},\"msg\":\"{err}\"}}"));
    println!("{encoded}");
}

fn print_result(output: &[u8]) {
    let mut stdout = std::io::stdout();
    let _ = stdout.write_all(output);
    let _ = stdout.flush();
}

/// Run one CNI invocation; the return value is the process exit code.
pub async fn run() -> i32 {
    let command = match std::env::var("CNI_COMMAND") {
        Ok(command) => command,
        Err(_) => {
            print_error(&Error::Config("CNI_COMMAND is not set".to_string()));
            return 1;
        }
    };

    if command == "VERSION" {
        println!(
            "{}",
            json!({"cniVersion": CNI_VERSION, "supportedVersions": SUPPORTED_VERSIONS})
        );
        return 0;
    }

    let args = match CmdArgs::from_env() {
        Ok(args) => args,
        Err(err) => {
            print_error(&err);
            return 1;
        }
    };

    let result = match command.as_str() {
        "ADD" => commands::cmd_add(&args).await.map(Some),
        "DEL" => commands::cmd_del(&args).await.map(|()| None),
        "CHECK" => commands::cmd_check(&args).await.map(|()| None),
        other => Err(Error::Config(format!(
            "unsupported CNI_COMMAND {other}"
        ))),
    };

    match result {
        Ok(Some(output)) => {
            print_result(&output);
            0
        }
        Ok(None) => 0,
        Err(err) => {
            print_error(&err);
            1
        }
    }
}
