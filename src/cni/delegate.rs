//! Delegate Invoker: hands the assembled document to the second plugin.
//!
//! External boundary only: the delegate binary is located on `CNI_PATH`,
//! spawned with the CNI environment of the current invocation and fed the
//! configuration document on stdin. Its stdout is the result; on failure
//! the CNI error message is extracted when present.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::CmdArgs;
use crate::error::{Error, Result};

/// Search path used when the runtime supplies none.
const DEFAULT_CNI_PATH: &str = "/opt/cni/bin";

/// Invoke `plugin` with `command` (ADD/DEL/CHECK) and the given document.
pub async fn invoke(
    plugin: &str,
    command: &str,
    config: &[u8],
    args: &CmdArgs,
) -> Result<Vec<u8>> {
    let binary = find_plugin(plugin, &args.path)?;
    debug!(binary = %binary.display(), command, "invoking delegate");

    let mut child = Command::new(&binary)
        .env("CNI_COMMAND", command)
        .env("CNI_CONTAINERID", &args.container_id)
        .env("CNI_NETNS", &args.netns)
        .env("CNI_IFNAME", &args.ifname)
        .env("CNI_ARGS", &args.args)
        .env("CNI_PATH", &args.path)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| Error::Delegate(format!("failed to exec delegate {plugin}: {err}")))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(config).await.map_err(|err| {
            Error::Delegate(format!("failed to write config to delegate {plugin}: {err}"))
        })?;
    }

    let output = child
        .wait_with_output()
        .await
        .map_err(|err| Error::Delegate(format!("failed to wait for delegate {plugin}: {err}")))?;

    if !output.status.success() {
        return Err(Error::Delegate(format!(
            "delegate {plugin} {command} failed: {}",
            failure_message(&output)
        )));
    }
    Ok(output.stdout)
}

/// Best available failure description: the CNI error object's `msg` when
/// stdout carries one, else stderr, else the exit status.
fn failure_message(output: &std::process::Output) -> String {
    if let Ok(value) = serde_json::from_slice::<Value>(&output.stdout) {
        if let Some(msg) = value.get("msg").and_then(Value::as_str) {
            return msg.to_string();
        }
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("exit status {}", output.status)
    } else {
        stderr.to_string()
    }
}

/// Locate an executable named `plugin` on the colon-separated search path.
fn find_plugin(plugin: &str, cni_path: &str) -> Result<PathBuf> {
    if plugin.is_empty() {
        return Err(Error::Config("delegate_plugin is not set".to_string()));
    }
    let search = if cni_path.is_empty() {
        DEFAULT_CNI_PATH
    } else {
        cni_path
    };
    for dir in search.split(':').filter(|dir| !dir.is_empty()) {
        let candidate = Path::new(dir).join(plugin);
        if let Ok(metadata) = std::fs::metadata(&candidate) {
            if metadata.is_file() && metadata.permissions().mode() & 0o111 != 0 {
                return Ok(candidate);
            }
        }
    }
    Err(Error::Delegate(format!(
        "delegate plugin {plugin} not found on CNI_PATH {search}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_plugin_requires_a_name() {
        let err = find_plugin("", "/tmp").unwrap_err();
        assert!(err.to_string().contains("delegate_plugin"));
    }

    #[test]
    fn test_find_plugin_reports_missing_binary() {
        let dir = tempfile::tempdir().unwrap();
        let err = find_plugin("ovs", &dir.path().display().to_string()).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_find_plugin_skips_non_executable_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ovs");
        std::fs::write(&path, "#!/bin/sh\n").unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o644);
        std::fs::set_permissions(&path, perms).unwrap();

        assert!(find_plugin("ovs", &dir.path().display().to_string()).is_err());

        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        assert_eq!(
            find_plugin("ovs", &dir.path().display().to_string()).unwrap(),
            path
        );
    }

    #[test]
    fn test_failure_message_prefers_cni_error_object() {
        use std::os::unix::process::ExitStatusExt;
        let output = std::process::Output {
            status: std::process::ExitStatus::from_raw(256),
            stdout: br#"{"code":7,"msg":"bridge missing"}"#.to_vec(),
            stderr: b"noise".to_vec(),
        };
        assert_eq!(failure_message(&output), "bridge missing");
    }

    #[test]
    fn test_failure_message_falls_back_to_stderr() {
        use std::os::unix::process::ExitStatusExt;
        let output = std::process::Output {
            status: std::process::ExitStatus::from_raw(256),
            stdout: Vec::new(),
            stderr: b"  cannot open bridge  ".to_vec(),
        };
        assert_eq!(failure_message(&output), "cannot open bridge");
    }
}
