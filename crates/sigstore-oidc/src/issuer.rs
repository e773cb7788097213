//! OpenID Connect issuer discovery

use crate::error::{Error, Result};
use crate::token::issuers;
use serde::{Deserialize, Serialize};

/// Production Sigstore OAuth issuer
pub const DEFAULT_OAUTH_ISSUER_URL: &str = issuers::SIGSTORE_OAUTH;

/// Staging Sigstore OAuth issuer
pub const STAGING_OAUTH_ISSUER_URL: &str = issuers::SIGSTORE_OAUTH_STAGING;

/// The subset of an OpenID Connect discovery document we need
///
/// See <https://openid.net/specs/openid-connect-discovery-1_0.html>
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenIdConfiguration {
    /// Where the user is sent to authorize
    pub authorization_endpoint: String,
    /// Where authorization codes are exchanged for tokens
    pub token_endpoint: String,
}

/// An OIDC identity provider
///
/// The discovery document is fetched once, when the issuer is created, and
/// never refreshed.
#[derive(Debug, Clone)]
pub struct Issuer {
    base_url: String,
    config: OpenIdConfiguration,
    client: reqwest::Client,
}

impl Issuer {
    /// Discover the issuer at `base_url`
    pub async fn discover(base_url: impl Into<String>) -> Result<Self> {
        Self::discover_with_client(base_url, reqwest::Client::new()).await
    }

    /// Discover the issuer at `base_url` using an existing HTTP client
    pub async fn discover_with_client(
        base_url: impl Into<String>,
        client: reqwest::Client,
    ) -> Result<Self> {
        let base_url = base_url.into();
        let url = discovery_url(&base_url);
        tracing::debug!("fetching OIDC configuration from {}", url);

        let response = client.get(&url).send().await.map_err(|e| Error::Discovery {
            url: url.clone(),
            message: "request failed".to_string(),
            source: Some(e),
        })?;

        let status = response.status();
        let response = response.error_for_status().map_err(|e| Error::Discovery {
            url: url.clone(),
            message: format!("issuer returned status {}", status),
            source: Some(e),
        })?;

        let body = response.text().await.map_err(|e| Error::Discovery {
            url: url.clone(),
            message: "failed to read response".to_string(),
            source: Some(e),
        })?;

        let config: OpenIdConfiguration =
            serde_json::from_str(&body).map_err(|e| Error::Discovery {
                url: url.clone(),
                message: format!("OIDC issuer returned invalid configuration: {}", e),
                source: None,
            })?;

        Ok(Self {
            base_url,
            config,
            client,
        })
    }

    /// Sigstore's production OAuth issuer
    pub async fn production() -> Result<Self> {
        Self::discover(DEFAULT_OAUTH_ISSUER_URL).await
    }

    /// Sigstore's staging OAuth issuer
    pub async fn staging() -> Result<Self> {
        Self::discover(STAGING_OAUTH_ISSUER_URL).await
    }

    /// The base URL this issuer was discovered from
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The discovered endpoints
    pub fn config(&self) -> &OpenIdConfiguration {
        &self.config
    }

    pub(crate) fn client(&self) -> &reqwest::Client {
        &self.client
    }
}

/// The discovery document URL for an issuer base URL
pub fn discovery_url(base_url: &str) -> String {
    format!(
        "{}/.well-known/openid-configuration",
        base_url.trim_end_matches('/')
    )
}
