//! Keystone authentication from conventional `OS_*` environment variables.
//!
//! The daemon authenticates once at startup with the v3 password method and
//! discovers the Neutron endpoint from the service catalog. Failure here is
//! fatal: the daemon never runs partially authenticated.

use std::path::Path;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::NeutronError;

/// Credentials and scope read from the process environment.
#[derive(Debug, Clone)]
pub struct AuthOptions {
    pub auth_url: String,
    pub username: String,
    pub password: String,
    pub project_name: String,
    pub user_domain_name: String,
    pub project_domain_name: String,
    pub region_name: Option<String>,
}

fn required(name: &'static str) -> Result<String, NeutronError> {
    std::env::var(name).map_err(|_| NeutronError::MissingEnv(name))
}

impl AuthOptions {
    /// Read `OS_AUTH_URL`, `OS_USERNAME`, `OS_PASSWORD`, `OS_PROJECT_NAME`
    /// (or `OS_TENANT_NAME`), the domain names (default "Default") and the
    /// optional `OS_REGION_NAME`.
    pub fn from_env() -> Result<Self, NeutronError> {
        let project_name = std::env::var("OS_PROJECT_NAME")
            .or_else(|_| std::env::var("OS_TENANT_NAME"))
            .map_err(|_| NeutronError::MissingEnv("OS_PROJECT_NAME"))?;
        Ok(Self {
            auth_url: required("OS_AUTH_URL")?,
            username: required("OS_USERNAME")?,
            password: required("OS_PASSWORD")?,
            project_name,
            user_domain_name: std::env::var("OS_USER_DOMAIN_NAME")
                .unwrap_or_else(|_| "Default".to_string()),
            project_domain_name: std::env::var("OS_PROJECT_DOMAIN_NAME")
                .unwrap_or_else(|_| "Default".to_string()),
            region_name: std::env::var("OS_REGION_NAME").ok(),
        })
    }
}

/// Load `KEY=VALUE` lines from a file into the process environment.
/// Blank lines and `#` comments are skipped, as are lines without `=`.
pub fn load_env_file(path: &Path) -> std::io::Result<()> {
    let contents = std::fs::read_to_string(path)?;
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        std::env::set_var(key.trim(), value.trim());
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub(crate) struct CatalogEntry {
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub endpoints: Vec<CatalogEndpoint>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CatalogEndpoint {
    #[serde(default)]
    pub interface: String,
    #[serde(default)]
    pub region: Option<String>,
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: TokenBody,
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    #[serde(default)]
    catalog: Vec<CatalogEntry>,
}

/// The v3 password-auth payload, scoped to the configured project.
fn auth_request_body(opts: &AuthOptions) -> Value {
    json!({
        "auth": {
            "identity": {
                "methods": ["password"],
                "password": {
                    "user": {
                        "name": opts.username,
                        "domain": {"name": opts.user_domain_name},
                        "password": opts.password,
                    }
                }
            },
            "scope": {
                "project": {
                    "name": opts.project_name,
                    "domain": {"name": opts.project_domain_name},
                }
            }
        }
    })
}

/// Pick the public `network` endpoint from the catalog, region-filtered
/// when a region is configured.
pub(crate) fn select_network_endpoint(
    catalog: &[CatalogEntry],
    region: Option<&str>,
) -> Option<String> {
    catalog
        .iter()
        .filter(|entry| entry.service_type == "network")
        .flat_map(|entry| entry.endpoints.iter())
        .find(|endpoint| {
            endpoint.interface == "public"
                && region.is_none_or(|want| endpoint.region.as_deref() == Some(want))
        })
        .map(|endpoint| endpoint.url.trim_end_matches('/').to_string())
}

/// Issue a token and resolve the Neutron endpoint.
pub(crate) async fn issue_token(
    http: &reqwest::Client,
    opts: &AuthOptions,
) -> Result<(String, String), NeutronError> {
    let url = format!("{}/auth/tokens", opts.auth_url.trim_end_matches('/'));
    debug!(%url, user = %opts.username, "requesting keystone token");

    let response = http.post(&url).json(&auth_request_body(opts)).send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(NeutronError::Auth(format!(
            "keystone returned {}: {}",
            status.as_u16(),
            body.trim()
        )));
    }

    let token = response
        .headers()
        .get("x-subject-token")
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
        .ok_or_else(|| NeutronError::Auth("keystone response carried no token".to_string()))?;

    let body: TokenResponse = response
        .json()
        .await
        .map_err(|err| NeutronError::Auth(format!("unreadable token response: {err}")))?;

    let endpoint = select_network_endpoint(&body.token.catalog, opts.region_name.as_deref())
        .ok_or_else(|| {
            NeutronError::Auth("no public network endpoint in service catalog".to_string())
        })?;

    Ok((token, endpoint))
}
