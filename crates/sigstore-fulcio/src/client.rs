//! Fulcio client for certificate issuance

use crate::error::{Error, Result};
use crate::sct::SignedCertificateTimestamp;
use serde::{Deserialize, Serialize};
use sigstore_oidc::IdentityToken;
use x509_cert::der::DecodePem;
use x509_cert::Certificate;

/// Production Fulcio signing-certificate endpoint
pub const DEFAULT_FULCIO_URL: &str = "https://fulcio.sigstore.dev/api/v1/signingCert";

/// Staging Fulcio signing-certificate endpoint
pub const STAGING_FULCIO_URL: &str = "https://fulcio.sigstage.dev/api/v1/signingCert";

/// Response header carrying the detached SCT
pub const SCT_HEADER: &str = "SCT";

/// Separator between certificates in the response body
const PEM_DELIMITER: &str = "-----BEGIN CERTIFICATE-----";

/// A certificate signing request, sent to Fulcio as JSON
///
/// The request schema belongs to the CA, so the body is carried as an
/// arbitrary JSON document and not validated locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CertificateRequest(serde_json::Value);

impl CertificateRequest {
    /// Build a request from any serializable value
    pub fn new<T: Serialize>(request: &T) -> Result<Self> {
        Ok(Self(serde_json::to_value(request)?))
    }

    /// Request body for Fulcio's v1 `signingCert` API
    ///
    /// `public_key` and `proof_of_possession` are base64 encoded; the proof is
    /// a signature over the token's subject made with the matching private key.
    pub fn public_key(
        algorithm: impl Into<String>,
        public_key: impl Into<String>,
        proof_of_possession: impl Into<String>,
    ) -> Self {
        Self(serde_json::json!({
            "publicKey": {
                "algorithm": algorithm.into(),
                "content": public_key.into(),
            },
            "signedEmailAddress": proof_of_possession.into(),
        }))
    }

    /// The JSON body
    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

impl From<serde_json::Value> for CertificateRequest {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

/// An issued certificate chain and its detached SCT
#[derive(Debug, Clone)]
pub struct CertificateResponse {
    certificate_chain: Vec<Certificate>,
    sct: Vec<u8>,
}

impl CertificateResponse {
    /// The chain, leaf first; never empty
    pub fn certificate_chain(&self) -> &[Certificate] {
        &self.certificate_chain
    }

    /// The issued signing certificate
    pub fn leaf(&self) -> &Certificate {
        &self.certificate_chain[0]
    }

    /// Raw value of the `SCT` header
    pub fn sct(&self) -> &[u8] {
        &self.sct
    }

    /// Decode the SCT
    pub fn decode_sct(&self) -> Result<SignedCertificateTimestamp> {
        Ok(SignedCertificateTimestamp::from_header(&self.sct)?)
    }

    pub fn into_parts(self) -> (Vec<Certificate>, Vec<u8>) {
        (self.certificate_chain, self.sct)
    }
}

/// A client for interacting with Fulcio
#[derive(Debug, Clone)]
pub struct FulcioClient {
    /// Signing-certificate endpoint
    url: String,
    /// HTTP client
    client: reqwest::Client,
}

impl FulcioClient {
    /// Create a client for the signing-certificate endpoint at `url`
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(url, reqwest::Client::new())
    }

    /// Create a client that shares an existing HTTP client
    pub fn with_client(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }

    /// Create a client for the public Sigstore Fulcio instance
    pub fn production() -> Self {
        Self::new(DEFAULT_FULCIO_URL)
    }

    /// Create a client for the Sigstore staging Fulcio instance
    pub fn staging() -> Self {
        Self::new(STAGING_FULCIO_URL)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Request a signing certificate for the identity in `token`
    ///
    /// Only `201 Created` counts as success. The response must carry the
    /// `SCT` header and a body of concatenated PEM certificates.
    pub async fn request_certificate(
        &self,
        request: &CertificateRequest,
        token: &IdentityToken,
    ) -> Result<CertificateResponse> {
        tracing::debug!("requesting signing certificate from {}", self.url);

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(token.as_str())
            .json(request)
            .send()
            .await
            .map_err(|source| Error::Http {
                url: self.url.clone(),
                source,
            })?;

        let status = response.status();
        if status != reqwest::StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::UnexpectedStatus {
                url: self.url.clone(),
                status: status.as_u16(),
                body,
            });
        }

        let sct = response
            .headers()
            .get(SCT_HEADER)
            .map(|value| value.as_bytes().to_vec())
            .filter(|value| !value.is_empty())
            .ok_or(Error::MissingSct)?;

        let body = response.text().await.map_err(|source| Error::Http {
            url: self.url.clone(),
            source,
        })?;
        let certificate_chain = parse_certificate_chain(&body)?;
        tracing::debug!("received {} certificate(s)", certificate_chain.len());

        Ok(CertificateResponse {
            certificate_chain,
            sct,
        })
    }
}

/// Parse a bundle of concatenated PEM certificates, preserving order
///
/// Nothing may precede the first certificate, and every block must parse.
pub fn parse_certificate_chain(body: &str) -> Result<Vec<Certificate>> {
    let mut blocks = body.split(PEM_DELIMITER);
    let prefix = blocks.next().unwrap_or_default();
    if !prefix.is_empty() {
        return Err(Error::MalformedChain(
            "unexpected data before the first certificate".to_string(),
        ));
    }

    let chain = blocks
        .enumerate()
        .map(|(index, block)| {
            let pem = format!("{}{}", PEM_DELIMITER, block);
            Certificate::from_pem(pem.trim().as_bytes()).map_err(|e| Error::Certificate {
                index,
                message: e.to_string(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    if chain.is_empty() {
        return Err(Error::MalformedChain("no certificates in response".to_string()));
    }
    Ok(chain)
}
