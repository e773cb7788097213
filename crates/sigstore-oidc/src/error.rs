//! Error types for sigstore-oidc

use thiserror::Error;

/// Errors that can occur while acquiring an identity token
#[derive(Error, Debug)]
pub enum Error {
    /// An ambient environment was recognized, but its credential could not be retrieved
    ///
    /// This is distinct from "no ambient credential": detectors that don't
    /// apply return `Ok(None)` instead.
    #[error("Ambient credential error: {message}")]
    AmbientCredential {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The OIDC discovery document could not be fetched or was incomplete
    #[error("Issuer discovery error ({url}): {message}")]
    Discovery {
        url: String,
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// The authorization step failed (provider error, bad callback, or interruption)
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// The token endpoint rejected the authorization code or was unreachable
    #[error("Token exchange error: {message}")]
    TokenExchange {
        message: String,
        status: Option<u16>,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// Local I/O failure (callback listener, terminal input)
    #[error("I/O error while {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn ambient(message: impl Into<String>) -> Self {
        Error::AmbientCredential {
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn ambient_http(message: impl Into<String>, source: reqwest::Error) -> Self {
        Error::AmbientCredential {
            message: message.into(),
            source: Some(source),
        }
    }

    pub(crate) fn io(context: &'static str, source: std::io::Error) -> Self {
        Error::Io { context, source }
    }

    /// Whether this is an identity error (authorization or token exchange failure)
    pub fn is_identity_error(&self) -> bool {
        matches!(self, Error::Authorization(_) | Error::TokenExchange { .. })
    }

    /// Whether this error came from ambient credential detection
    pub fn is_ambient_error(&self) -> bool {
        matches!(self, Error::AmbientCredential { .. })
    }
}

/// Result type for OIDC operations
pub type Result<T> = std::result::Result<T, Error>;
