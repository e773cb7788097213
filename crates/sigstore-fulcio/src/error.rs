//! Error types for sigstore-fulcio

use thiserror::Error;

/// Errors from decoding a Signed Certificate Timestamp
#[derive(Error, Debug)]
pub enum SctError {
    /// Only v1 (encoded as `0`) exists
    #[error("unsupported SCT version: {0}")]
    UnsupportedVersion(i64),

    /// A binary field was not valid standard base64
    #[error("invalid base64 in SCT field `{field}`: {source}")]
    Base64 {
        field: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    /// The digitally-signed struct is shorter than its 4-byte header
    #[error("impossibly small digitally-signed struct ({0} bytes)")]
    TooShort(usize),

    /// The declared signature length disagrees with the bytes present
    #[error("invalid digitally-signed struct: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// The timestamp can't be represented as a calendar instant
    #[error("SCT timestamp out of range: {0} ms")]
    TimestampOutOfRange(u64),

    /// The `SCT` response header couldn't be parsed
    #[error("malformed SCT header: {0}")]
    Header(String),
}

/// Errors that can occur in Fulcio operations
#[derive(Error, Debug)]
pub enum Error {
    /// Fulcio could not be reached
    #[error("HTTP error contacting {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Fulcio answered with something other than 201 Created
    #[error("unexpected status {status} from {url}: {body}")]
    UnexpectedStatus {
        url: String,
        status: u16,
        body: String,
    },

    /// A successful response without the detached SCT
    #[error("Fulcio response is missing the SCT header")]
    MissingSct,

    /// The PEM bundle is not a sequence of certificates
    #[error("malformed certificate chain: {0}")]
    MalformedChain(String),

    /// A certificate in the bundle failed to parse
    #[error("invalid certificate at index {index}: {message}")]
    Certificate { index: usize, message: String },

    /// The SCT failed validation
    #[error("SCT error: {0}")]
    Sct(#[from] SctError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether this is an SCT validation failure rather than an issuance failure
    pub fn is_sct_error(&self) -> bool {
        matches!(self, Error::Sct(_))
    }
}

/// Result type for Fulcio operations
pub type Result<T> = std::result::Result<T, Error>;
