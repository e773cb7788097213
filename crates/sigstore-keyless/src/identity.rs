//! Identity token selection

use crate::config::IdentityConfig;
use crate::error::Result;
use sigstore_oidc::{
    default_detectors, detect_credential_with, AmbientDetector, AmbientEnv, IdentityToken,
    InteractivePrompt, Issuer, TerminalPrompt,
};

/// Obtain an identity token from the process environment or the terminal
///
/// Precedence is: the explicit token, then an ambient credential unless
/// disabled, then the interactive OAuth flow.
pub async fn get_identity_token(config: &IdentityConfig) -> Result<IdentityToken> {
    get_identity_token_with(config, &AmbientEnv::from_process(), &TerminalPrompt).await
}

/// Like [`get_identity_token`], with an explicit environment and prompt
///
/// Sources are tried one after another, never concurrently.
pub async fn get_identity_token_with(
    config: &IdentityConfig,
    env: &AmbientEnv,
    prompt: &dyn InteractivePrompt,
) -> Result<IdentityToken> {
    get_identity_token_with_detectors(config, &default_detectors(), env, prompt).await
}

/// Like [`get_identity_token_with`], consulting `detectors` for the ambient step
///
/// Detectors run in slice order; an empty slice skips straight to the
/// interactive flow.
pub async fn get_identity_token_with_detectors(
    config: &IdentityConfig,
    detectors: &[Box<dyn AmbientDetector>],
    env: &AmbientEnv,
    prompt: &dyn InteractivePrompt,
) -> Result<IdentityToken> {
    if let Some(token) = config.identity_token.as_deref().filter(|t| !t.is_empty()) {
        tracing::debug!("using explicitly supplied identity token");
        return Ok(IdentityToken::new(token));
    }

    let client = reqwest::Client::new();

    if config.disable_ambient {
        tracing::debug!("ambient credential detection disabled");
    } else if let Some(token) = detect_credential_with(detectors, env, &client).await? {
        return Ok(token);
    }

    tracing::debug!(
        "no ambient credential; starting interactive flow with {}",
        config.oidc_issuer
    );
    let issuer = Issuer::discover_with_client(config.oidc_issuer.as_str(), client).await?;
    Ok(issuer.identity_token_with_prompt(&config.oauth, prompt).await?)
}
