//! Keyless signing configuration

use sigstore_fulcio::{DEFAULT_FULCIO_URL, STAGING_FULCIO_URL};
use sigstore_oidc::{
    OAuthConfig, DEFAULT_OAUTH_ISSUER_URL, FORCE_OOB_ENV, STAGING_OAUTH_ISSUER_URL,
};
use std::fmt;

/// Explicit identity token
pub const IDENTITY_TOKEN_ENV: &str = "SIGSTORE_IDENTITY_TOKEN";
/// OIDC issuer for the interactive flow
pub const OIDC_ISSUER_ENV: &str = "SIGSTORE_OIDC_ISSUER";
/// OAuth client ID
pub const OIDC_CLIENT_ID_ENV: &str = "SIGSTORE_OIDC_CLIENT_ID";
/// OAuth client secret
pub const OIDC_CLIENT_SECRET_ENV: &str = "SIGSTORE_OIDC_CLIENT_SECRET";
/// Skip ambient credential detection
pub const DISABLE_AMBIENT_ENV: &str = "SIGSTORE_OIDC_DISABLE_AMBIENT_PROVIDERS";
/// Fulcio signing-certificate endpoint
pub const FULCIO_URL_ENV: &str = "SIGSTORE_FULCIO_URL";

/// Where identity tokens come from
///
/// Sources are tried in order: [`identity_token`](Self::identity_token),
/// then ambient detection unless disabled, then the interactive flow
/// against [`oidc_issuer`](Self::oidc_issuer).
#[derive(Clone)]
pub struct IdentityConfig {
    /// Explicitly supplied token
    pub identity_token: Option<String>,
    /// Skip ambient credential detection
    pub disable_ambient: bool,
    /// Issuer for the interactive flow
    pub oidc_issuer: String,
    /// OAuth client settings for the interactive flow
    pub oauth: OAuthConfig,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            identity_token: None,
            disable_ambient: false,
            oidc_issuer: DEFAULT_OAUTH_ISSUER_URL.to_string(),
            oauth: OAuthConfig::sigstore(),
        }
    }
}

impl IdentityConfig {
    /// Sigstore public-good issuer
    pub fn production() -> Self {
        Self::default()
    }

    /// Sigstore staging issuer
    pub fn staging() -> Self {
        Self {
            oidc_issuer: STAGING_OAUTH_ISSUER_URL.to_string(),
            ..Self::default()
        }
    }

    /// Production defaults overridden by `SIGSTORE_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Production defaults overridden through `lookup`; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.is_empty());
        let mut config = Self::production();

        config.identity_token = get(IDENTITY_TOKEN_ENV);
        config.disable_ambient = get(DISABLE_AMBIENT_ENV).is_some_and(|v| is_truthy(&v));
        if let Some(issuer) = get(OIDC_ISSUER_ENV) {
            config.oidc_issuer = issuer;
        }
        if let Some(client_id) = get(OIDC_CLIENT_ID_ENV) {
            config.oauth.client_id = client_id;
        }
        if let Some(client_secret) = get(OIDC_CLIENT_SECRET_ENV) {
            config.oauth.client_secret = client_secret;
        }
        config.oauth.force_oob = get(FORCE_OOB_ENV).is_some();
        config
    }

    pub fn with_identity_token(mut self, token: impl Into<String>) -> Self {
        self.identity_token = Some(token.into());
        self
    }

    pub fn with_disable_ambient(mut self, disable: bool) -> Self {
        self.disable_ambient = disable;
        self
    }

    pub fn with_oidc_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.oidc_issuer = issuer.into();
        self
    }

    pub fn with_oauth(mut self, oauth: OAuthConfig) -> Self {
        self.oauth = oauth;
        self
    }
}

impl fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityConfig")
            .field(
                "identity_token",
                &self.identity_token.as_ref().map(|_| "<redacted>"),
            )
            .field("disable_ambient", &self.disable_ambient)
            .field("oidc_issuer", &self.oidc_issuer)
            .field("oauth", &self.oauth)
            .finish()
    }
}

/// `1`, `true`, `yes` and `on`, in any case
fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Configuration for obtaining a keyless signing certificate
#[derive(Debug, Clone)]
pub struct KeylessConfig {
    /// Fulcio signing-certificate endpoint
    pub fulcio_url: String,
    /// Identity token sources
    pub identity: IdentityConfig,
}

impl Default for KeylessConfig {
    fn default() -> Self {
        Self {
            fulcio_url: DEFAULT_FULCIO_URL.to_string(),
            identity: IdentityConfig::production(),
        }
    }
}

impl KeylessConfig {
    /// Create configuration for Sigstore public-good instance
    pub fn production() -> Self {
        Self::default()
    }

    /// Create configuration for Sigstore staging instance
    pub fn staging() -> Self {
        Self {
            fulcio_url: STAGING_FULCIO_URL.to_string(),
            identity: IdentityConfig::staging(),
        }
    }

    /// Production defaults overridden by `SIGSTORE_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let fulcio_url = lookup(FULCIO_URL_ENV)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_FULCIO_URL.to_string());
        Self {
            fulcio_url,
            identity: IdentityConfig::from_lookup(lookup),
        }
    }
}
