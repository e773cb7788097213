//! Error types for sigstore-keyless

use thiserror::Error;

/// Errors from obtaining an identity or a signing certificate
#[derive(Error, Debug)]
pub enum Error {
    /// Identity token acquisition failed
    #[error(transparent)]
    Oidc(#[from] sigstore_oidc::Error),

    /// Certificate issuance or SCT decoding failed
    #[error(transparent)]
    Fulcio(#[from] sigstore_fulcio::Error),
}

impl Error {
    /// Whether the failure came from SCT validation
    pub fn is_sct_error(&self) -> bool {
        matches!(self, Error::Fulcio(e) if e.is_sct_error())
    }
}

/// Result type for keyless operations
pub type Result<T> = std::result::Result<T, Error>;
