//! Identity token handling

use std::fmt;

/// An OIDC identity token, treated as an opaque bearer string
///
/// The token is handed to Fulcio as-is; its claims are never inspected here.
/// `Debug` output is redacted so the token can't leak into logs.
#[derive(Clone, PartialEq, Eq)]
pub struct IdentityToken(String);

impl IdentityToken {
    /// Wrap a raw token string
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Get the raw token string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the raw token string
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for IdentityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IdentityToken(<redacted>)")
    }
}

impl From<String> for IdentityToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for IdentityToken {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

/// Known OIDC issuers
pub mod issuers {
    /// Sigstore's public Dex instance
    pub const SIGSTORE_OAUTH: &str = "https://oauth2.sigstore.dev/auth";
    /// Sigstore's staging Dex instance
    pub const SIGSTORE_OAUTH_STAGING: &str = "https://oauth2.sigstage.dev/auth";
}
