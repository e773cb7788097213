//! OpenID Connect identity provider for Sigstore
//!
//! This crate handles identity token acquisition through ambient credential
//! detection (CI platforms, cloud metadata) and the interactive OAuth
//! authorization code flow with PKCE.

pub mod ambient;
pub mod callback;
pub mod error;
pub mod issuer;
pub mod oauth;
pub mod token;

pub use ambient::{
    default_detectors, detect_credential, detect_credential_with, AmbientDetector, AmbientEnv,
    DetectFuture, GcpMetadata, GitHubActions, SIGSTORE_AUDIENCE,
};
pub use callback::{AuthorizationResponse, CallbackListener, CallbackServer};
pub use error::{Error, Result};
pub use issuer::{
    Issuer, OpenIdConfiguration, DEFAULT_OAUTH_ISSUER_URL, STAGING_OAUTH_ISSUER_URL,
};
pub use oauth::{
    FlowSession, InteractivePrompt, OAuthConfig, Pkce, PromptFuture, TerminalPrompt,
    FORCE_OOB_ENV, OOB_REDIRECT_URI,
};
pub use token::{issuers, IdentityToken};
