//! Certificate issuance with SCT decoding

use crate::error::Result;
use sigstore_fulcio::{CertificateRequest, FulcioClient, SignedCertificateTimestamp};
use sigstore_oidc::IdentityToken;
use x509_cert::Certificate;

/// A signing certificate chain with its validated SCT
#[derive(Debug, Clone)]
pub struct IssuedCertificate {
    /// Chain, leaf first
    pub certificate_chain: Vec<Certificate>,
    /// Decoded detached SCT
    pub sct: SignedCertificateTimestamp,
}

impl IssuedCertificate {
    /// The signing certificate
    pub fn leaf(&self) -> Option<&Certificate> {
        self.certificate_chain.first()
    }
}

/// Request a certificate and decode the SCT that comes with it
///
/// An SCT that fails validation fails the whole issuance.
pub async fn issue_certificate(
    client: &FulcioClient,
    request: &CertificateRequest,
    token: &IdentityToken,
) -> Result<IssuedCertificate> {
    let response = client.request_certificate(request, token).await?;
    let sct = response.decode_sct()?;
    tracing::debug!(
        "issued {} certificate(s), SCT timestamp {}",
        response.certificate_chain().len(),
        sct.timestamp()
    );

    let (certificate_chain, _) = response.into_parts();
    Ok(IssuedCertificate {
        certificate_chain,
        sct,
    })
}
