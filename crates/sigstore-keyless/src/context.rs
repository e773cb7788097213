//! Keyless signing context

use crate::config::KeylessConfig;
use crate::error::Result;
use crate::identity::{
    get_identity_token, get_identity_token_with, get_identity_token_with_detectors,
};
use crate::issue::{issue_certificate, IssuedCertificate};
use sigstore_fulcio::{CertificateRequest, FulcioClient};
use sigstore_oidc::{AmbientDetector, AmbientEnv, IdentityToken, InteractivePrompt};

/// Obtains identities and signing certificates for one configuration
#[derive(Debug, Clone)]
pub struct KeylessContext {
    config: KeylessConfig,
    fulcio: FulcioClient,
}

impl KeylessContext {
    /// Create a new context with default configuration
    pub fn new() -> Self {
        Self::with_config(KeylessConfig::default())
    }

    /// Create a new context with custom configuration
    pub fn with_config(config: KeylessConfig) -> Self {
        let fulcio = FulcioClient::new(config.fulcio_url.clone());
        Self { config, fulcio }
    }

    /// Create a context for the public-good instance
    pub fn production() -> Self {
        Self::with_config(KeylessConfig::production())
    }

    /// Create a context for the staging instance
    pub fn staging() -> Self {
        Self::with_config(KeylessConfig::staging())
    }

    /// Get the configuration
    pub fn config(&self) -> &KeylessConfig {
        &self.config
    }

    pub fn fulcio(&self) -> &FulcioClient {
        &self.fulcio
    }

    /// Obtain an identity token from the process environment or the terminal
    pub async fn identity_token(&self) -> Result<IdentityToken> {
        get_identity_token(&self.config.identity).await
    }

    /// Obtain an identity token with an explicit environment and prompt
    pub async fn identity_token_with(
        &self,
        env: &AmbientEnv,
        prompt: &dyn InteractivePrompt,
    ) -> Result<IdentityToken> {
        get_identity_token_with(&self.config.identity, env, prompt).await
    }

    /// Like [`identity_token_with`](Self::identity_token_with), with custom ambient detectors
    pub async fn identity_token_with_detectors(
        &self,
        detectors: &[Box<dyn AmbientDetector>],
        env: &AmbientEnv,
        prompt: &dyn InteractivePrompt,
    ) -> Result<IdentityToken> {
        get_identity_token_with_detectors(&self.config.identity, detectors, env, prompt).await
    }

    /// Request a signing certificate for `token`
    pub async fn issue_certificate(
        &self,
        request: &CertificateRequest,
        token: &IdentityToken,
    ) -> Result<IssuedCertificate> {
        issue_certificate(&self.fulcio, request, token).await
    }
}

impl Default for KeylessContext {
    fn default() -> Self {
        Self::new()
    }
}
