//! Ambient credential detection for CI/CD and cloud environments
//!
//! This module retrieves OIDC tokens that the execution environment makes
//! available without user interaction. Detectors run in a fixed order and the
//! first token found wins.
//!
//! A detector has three outcomes:
//! - `Ok(None)`: the environment isn't the one this detector handles
//! - `Ok(Some(token))`: a credential was retrieved
//! - `Err(Error::AmbientCredential { .. })`: the environment was recognized,
//!   but the credential couldn't be retrieved
//!
//! The last case stops detection. Falling through to the next detector there
//! would hide a misconfigured environment, such as a GitHub workflow that
//! lacks `id-token: write`.

use crate::error::{Error, Result};
use crate::token::IdentityToken;
use serde::Deserialize;
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

/// Default audience for Sigstore OIDC tokens
pub const SIGSTORE_AUDIENCE: &str = "sigstore";

/// File holding the DMI product name on Linux hosts
pub const GCP_PRODUCT_NAME_FILE: &str = "/sys/class/dmi/id/product_name";

/// GCE metadata server endpoint for the default service account's identity token
pub const GCP_ID_TOKEN_REQUEST_URL: &str =
    "http://metadata/computeMetadata/v1/instance/service-accounts/default/identity";

/// Product names reported by Google Compute Engine hosts
const GCP_PRODUCT_NAMES: &[&str] = &["Google", "Google Compute Engine"];

const GITHUB_ACTIONS: &str = "GITHUB_ACTIONS";
const GITHUB_REQUEST_TOKEN: &str = "ACTIONS_ID_TOKEN_REQUEST_TOKEN";
const GITHUB_REQUEST_URL: &str = "ACTIONS_ID_TOKEN_REQUEST_URL";

/// Future returned by [`AmbientDetector::detect`]
pub type DetectFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Option<IdentityToken>>> + Send + 'a>>;

/// Snapshot of everything the ambient detectors look at
///
/// Detectors never read process state directly; they get one of these.
/// [`AmbientEnv::from_process`] captures the real environment.
#[derive(Debug, Clone)]
pub struct AmbientEnv {
    vars: HashMap<String, String>,
    gcp_product_name_file: PathBuf,
    gcp_token_url: String,
    audience: String,
}

impl Default for AmbientEnv {
    fn default() -> Self {
        Self {
            vars: HashMap::new(),
            gcp_product_name_file: PathBuf::from(GCP_PRODUCT_NAME_FILE),
            gcp_token_url: GCP_ID_TOKEN_REQUEST_URL.to_string(),
            audience: SIGSTORE_AUDIENCE.to_string(),
        }
    }
}

impl AmbientEnv {
    /// Capture the current process environment
    pub fn from_process() -> Self {
        let vars = std::env::vars_os()
            .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
            .collect();
        Self {
            vars,
            ..Self::default()
        }
    }

    /// Set an environment variable in the snapshot
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// Override the path of the GCP product name file
    pub fn with_gcp_product_name_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.gcp_product_name_file = path.into();
        self
    }

    /// Override the GCP metadata identity endpoint
    pub fn with_gcp_token_url(mut self, url: impl Into<String>) -> Self {
        self.gcp_token_url = url.into();
        self
    }

    /// Override the requested token audience
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience = audience.into();
        self
    }

    /// Look up a variable; empty values count as unset
    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// The audience to request tokens for
    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Path of the GCP product name file
    pub fn gcp_product_name_file(&self) -> &Path {
        &self.gcp_product_name_file
    }

    /// GCP metadata identity endpoint
    pub fn gcp_token_url(&self) -> &str {
        &self.gcp_token_url
    }
}

/// A source of ambient credentials
///
/// Implementations must return `Ok(None)` when their environment isn't
/// present, and an error only once they've recognized it.
pub trait AmbientDetector: Send + Sync {
    /// Short name used in log messages
    fn name(&self) -> &'static str;

    /// Try to retrieve a credential from the given environment
    fn detect<'a>(
        &'a self,
        env: &'a AmbientEnv,
        client: &'a reqwest::Client,
    ) -> DetectFuture<'a>;
}

/// GitHub Actions OIDC token provider
#[derive(Debug, Clone, Copy, Default)]
pub struct GitHubActions;

impl AmbientDetector for GitHubActions {
    fn name(&self) -> &'static str {
        "GitHub"
    }

    fn detect<'a>(
        &'a self,
        env: &'a AmbientEnv,
        client: &'a reqwest::Client,
    ) -> DetectFuture<'a> {
        Box::pin(detect_github(env, client))
    }
}

/// Google Compute Engine metadata server
#[derive(Debug, Clone, Copy, Default)]
pub struct GcpMetadata;

impl AmbientDetector for GcpMetadata {
    fn name(&self) -> &'static str {
        "GCP"
    }

    fn detect<'a>(
        &'a self,
        env: &'a AmbientEnv,
        client: &'a reqwest::Client,
    ) -> DetectFuture<'a> {
        Box::pin(detect_gcp(env, client))
    }
}

/// The built-in detectors, in the order they are tried
pub fn default_detectors() -> Vec<Box<dyn AmbientDetector>> {
    vec![Box::new(GitHubActions), Box::new(GcpMetadata)]
}

/// Run `detectors` in order and return the first credential found
///
/// Returns `Ok(None)` if no detector applies. The first error aborts detection.
pub async fn detect_credential_with(
    detectors: &[Box<dyn AmbientDetector>],
    env: &AmbientEnv,
    client: &reqwest::Client,
) -> Result<Option<IdentityToken>> {
    for detector in detectors {
        if let Some(token) = detector.detect(env, client).await? {
            tracing::debug!("{}: found ambient credential", detector.name());
            return Ok(Some(token));
        }
    }
    tracing::debug!("no ambient credential detected");
    Ok(None)
}

/// Detect an ambient credential in the current process environment
pub async fn detect_credential() -> Result<Option<IdentityToken>> {
    let env = AmbientEnv::from_process();
    let client = reqwest::Client::new();
    detect_credential_with(&default_detectors(), &env, &client).await
}

#[derive(Deserialize)]
struct GitHubTokenPayload {
    value: String,
}

async fn detect_github(
    env: &AmbientEnv,
    client: &reqwest::Client,
) -> Result<Option<IdentityToken>> {
    tracing::debug!("GitHub: looking for OIDC credentials");
    if env.var(GITHUB_ACTIONS).is_none() {
        tracing::debug!("GitHub: environment doesn't look like a GH action; giving up");
        return Ok(None);
    }

    // Both are only present when the workflow has `id-token: write`
    let (Some(request_token), Some(request_url)) =
        (env.var(GITHUB_REQUEST_TOKEN), env.var(GITHUB_REQUEST_URL))
    else {
        return Err(Error::ambient(
            "GitHub: missing or insufficient OIDC token permissions?",
        ));
    };

    tracing::debug!("GitHub: requesting OIDC token");
    let response = client
        .get(request_url)
        .query(&[("audience", env.audience())])
        .header(reqwest::header::AUTHORIZATION, format!("bearer {}", request_token))
        .send()
        .await
        .map_err(|e| Error::ambient_http("GitHub: OIDC token request failed", e))?;

    let status = response.status();
    let response = response.error_for_status().map_err(|e| {
        Error::ambient_http(
            format!("GitHub: OIDC token request failed (code={})", status.as_u16()),
            e,
        )
    })?;

    let body = response
        .text()
        .await
        .map_err(|e| Error::ambient_http("GitHub: failed to read OIDC token response", e))?;
    let payload: GitHubTokenPayload = serde_json::from_str(&body)
        .map_err(|e| Error::ambient(format!("GitHub: malformed or incomplete JSON: {}", e)))?;

    tracing::debug!("GitHub: successfully requested OIDC token");
    Ok(Some(IdentityToken::new(payload.value)))
}

async fn detect_gcp(env: &AmbientEnv, client: &reqwest::Client) -> Result<Option<IdentityToken>> {
    tracing::debug!("GCP: looking for OIDC credentials");
    let name = match tokio::fs::read_to_string(env.gcp_product_name_file()).await {
        Ok(contents) => contents.trim().to_string(),
        Err(_) => {
            tracing::debug!("GCP: environment doesn't have GCP product name file; giving up");
            return Ok(None);
        }
    };

    if !GCP_PRODUCT_NAMES.contains(&name.as_str()) {
        return Err(Error::ambient(format!(
            "GCP: product name file exists, but product name is {:?}; giving up",
            name
        )));
    }

    tracing::debug!("GCP: requesting OIDC token");
    let response = client
        .get(env.gcp_token_url())
        .query(&[("audience", env.audience()), ("format", "full")])
        .header("Metadata-Flavor", "Google")
        .send()
        .await
        .map_err(|e| Error::ambient_http("GCP: OIDC token request failed", e))?;

    let status = response.status();
    let response = response.error_for_status().map_err(|e| {
        Error::ambient_http(
            format!("GCP: OIDC token request failed (code={})", status.as_u16()),
            e,
        )
    })?;

    let token = response
        .text()
        .await
        .map_err(|e| Error::ambient_http("GCP: failed to read OIDC token response", e))?;

    tracing::debug!("GCP: successfully requested OIDC token");
    Ok(Some(IdentityToken::new(token)))
}
