//! Signed Certificate Timestamps
//!
//! Fulcio returns a detached SCT (RFC 6962 section 3.2) alongside each issued
//! certificate. The SCT is issued against the final leaf certificate, never a
//! precertificate, so its entry type is always [`LogEntryType::X509Certificate`].
//!
//! The signature travels as a TLS `DigitallySigned` struct (RFC 5246
//! section 4.7):
//!
//! ```text
//! +------+------+-----------+-----------------+
//! | hash | sig  | length    | signature       |
//! | u8   | u8   | u16 (BE)  | `length` bytes  |
//! +------+------+-----------+-----------------+
//! ```

use crate::error::SctError;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Size of the `DigitallySigned` header: hash, signature, and length
const DIGITALLY_SIGNED_HEADER_LEN: usize = 4;

/// SCT structure version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Version {
    V1,
}

impl Version {
    /// Wire encoding of this version
    pub fn value(self) -> i64 {
        match self {
            Version::V1 => 0,
        }
    }
}

impl TryFrom<i64> for Version {
    type Error = SctError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Version::V1),
            other => Err(SctError::UnsupportedVersion(other)),
        }
    }
}

/// What kind of log entry an SCT covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogEntryType {
    X509Certificate,
}

/// TLS `HashAlgorithm` codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashAlgorithm {
    None,
    Md5,
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
    Unknown(u8),
}

impl From<u8> for HashAlgorithm {
    fn from(value: u8) -> Self {
        match value {
            0 => HashAlgorithm::None,
            1 => HashAlgorithm::Md5,
            2 => HashAlgorithm::Sha1,
            3 => HashAlgorithm::Sha224,
            4 => HashAlgorithm::Sha256,
            5 => HashAlgorithm::Sha384,
            6 => HashAlgorithm::Sha512,
            other => HashAlgorithm::Unknown(other),
        }
    }
}

/// TLS `SignatureAlgorithm` codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureAlgorithm {
    Anonymous,
    Rsa,
    Dsa,
    Ecdsa,
    Unknown(u8),
}

impl From<u8> for SignatureAlgorithm {
    fn from(value: u8) -> Self {
        match value {
            0 => SignatureAlgorithm::Anonymous,
            1 => SignatureAlgorithm::Rsa,
            2 => SignatureAlgorithm::Dsa,
            3 => SignatureAlgorithm::Ecdsa,
            other => SignatureAlgorithm::Unknown(other),
        }
    }
}

/// JSON form of the SCT carried in Fulcio's `SCT` response header
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SctHeader {
    sct_version: i64,
    id: String,
    timestamp: u64,
    #[serde(default)]
    extensions: String,
    signature: String,
}

/// A validated Signed Certificate Timestamp
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedCertificateTimestamp {
    version: Version,
    log_id: Vec<u8>,
    raw_timestamp: u64,
    timestamp: DateTime<Utc>,
    digitally_signed: Vec<u8>,
    extensions: Vec<u8>,
}

impl SignedCertificateTimestamp {
    /// Decode an SCT from its raw fields
    ///
    /// `log_id`, `digitally_signed` and `extensions` are standard base64.
    /// `raw_timestamp_ms` is milliseconds since the Unix epoch.
    pub fn decode(
        raw_version: i64,
        raw_log_id_b64: &str,
        raw_timestamp_ms: u64,
        raw_digitally_signed_b64: &str,
        raw_extensions_b64: &str,
    ) -> Result<Self, SctError> {
        let version = Version::try_from(raw_version)?;
        let log_id = decode_base64("log_id", raw_log_id_b64)?;
        let digitally_signed = decode_base64("digitally_signed", raw_digitally_signed_b64)?;
        let extensions = decode_base64("extensions", raw_extensions_b64)?;

        check_digitally_signed(&digitally_signed)?;
        let timestamp = timestamp_from_millis(raw_timestamp_ms)?;

        Ok(Self {
            version,
            log_id,
            raw_timestamp: raw_timestamp_ms,
            timestamp,
            digitally_signed,
            extensions,
        })
    }

    /// Decode the value of Fulcio's `SCT` response header
    ///
    /// The header holds a JSON document, either verbatim or base64-encoded.
    pub fn from_header(value: &[u8]) -> Result<Self, SctError> {
        let value = String::from_utf8_lossy(value);
        let value = value.trim();
        let json = if value.starts_with('{') {
            value.as_bytes().to_vec()
        } else {
            STANDARD
                .decode(value)
                .map_err(|e| SctError::Header(format!("not base64 or JSON: {}", e)))?
        };

        let header: SctHeader =
            serde_json::from_slice(&json).map_err(|e| SctError::Header(e.to_string()))?;

        Self::decode(
            header.sct_version,
            &header.id,
            header.timestamp,
            &header.signature,
            &header.extensions,
        )
    }

    /// Encode as a base64 `SCT` header value
    pub fn to_header(&self) -> String {
        let header = SctHeader {
            sct_version: self.version.value(),
            id: STANDARD.encode(&self.log_id),
            timestamp: self.raw_timestamp,
            extensions: STANDARD.encode(&self.extensions),
            signature: STANDARD.encode(&self.digitally_signed),
        };
        // strings and integers only; serialization is infallible
        STANDARD.encode(serde_json::to_vec(&header).unwrap_or_default())
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// The log's key ID
    pub fn log_id(&self) -> &[u8] {
        &self.log_id
    }

    /// Milliseconds since the Unix epoch, as issued
    pub fn raw_timestamp(&self) -> u64 {
        self.raw_timestamp
    }

    /// Issuance time, truncated to whole seconds
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn entry_type(&self) -> LogEntryType {
        LogEntryType::X509Certificate
    }

    /// The full `DigitallySigned` struct, header included
    pub fn digitally_signed(&self) -> &[u8] {
        &self.digitally_signed
    }

    pub fn extensions(&self) -> &[u8] {
        &self.extensions
    }

    /// Raw hash algorithm code (byte 0 of the `DigitallySigned` struct)
    pub fn signature_hash_algorithm(&self) -> u8 {
        self.digitally_signed[0]
    }

    /// Raw signature algorithm code (byte 1 of the `DigitallySigned` struct)
    pub fn signature_algorithm(&self) -> u8 {
        self.digitally_signed[1]
    }

    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.signature_hash_algorithm().into()
    }

    pub fn signature_algorithm_kind(&self) -> SignatureAlgorithm {
        self.signature_algorithm().into()
    }

    /// The signature bytes, without the `DigitallySigned` header
    pub fn signature(&self) -> &[u8] {
        &self.digitally_signed[DIGITALLY_SIGNED_HEADER_LEN..]
    }
}

fn decode_base64(field: &'static str, value: &str) -> Result<Vec<u8>, SctError> {
    STANDARD
        .decode(value)
        .map_err(|source| SctError::Base64 { field, source })
}

/// Validate the `DigitallySigned` header against the bytes that follow it
fn check_digitally_signed(digitally_signed: &[u8]) -> Result<(), SctError> {
    if digitally_signed.len() < DIGITALLY_SIGNED_HEADER_LEN {
        return Err(SctError::TooShort(digitally_signed.len()));
    }

    let expected = u16::from_be_bytes([digitally_signed[2], digitally_signed[3]]) as usize;
    let actual = digitally_signed.len() - DIGITALLY_SIGNED_HEADER_LEN;
    if expected != actual {
        return Err(SctError::LengthMismatch { expected, actual });
    }
    Ok(())
}

fn timestamp_from_millis(millis: u64) -> Result<DateTime<Utc>, SctError> {
    i64::try_from(millis / 1000)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .ok_or(SctError::TimestampOutOfRange(millis))
}
