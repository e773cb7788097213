//! Keyless signing identity for Sigstore
//!
//! Ties identity token acquisition to certificate issuance: a token is taken
//! from explicit configuration, the ambient environment, or an interactive
//! OAuth flow, in that order, and exchanged with Fulcio for a short-lived
//! signing certificate whose SCT is decoded and validated.
//!
//! ```no_run
//! use sigstore_keyless::{CertificateRequest, KeylessContext};
//!
//! # async fn example() -> sigstore_keyless::Result<()> {
//! let context = KeylessContext::production();
//! let token = context.identity_token().await?;
//! let request = CertificateRequest::public_key("ecdsa", "<base64 key>", "<base64 proof>");
//! let issued = context.issue_certificate(&request, &token).await?;
//! println!("SCT issued at {}", issued.sct.timestamp());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod identity;
pub mod issue;

pub use config::{IdentityConfig, KeylessConfig};
pub use context::KeylessContext;
pub use error::{Error, Result};
pub use identity::{get_identity_token, get_identity_token_with, get_identity_token_with_detectors};
pub use issue::{issue_certificate, IssuedCertificate};

pub use sigstore_fulcio::{CertificateRequest, FulcioClient, SignedCertificateTimestamp};
pub use sigstore_oidc::{
    AmbientDetector, AmbientEnv, IdentityToken, InteractivePrompt, OAuthConfig,
};
