//! Fulcio certificate authority client for Sigstore
//!
//! This crate exchanges an OIDC identity token for a short-lived signing
//! certificate chain, and decodes the Signed Certificate Timestamp Fulcio
//! returns with it.

pub mod client;
pub mod error;
pub mod sct;

pub use client::{
    parse_certificate_chain, CertificateRequest, CertificateResponse, FulcioClient,
    DEFAULT_FULCIO_URL, SCT_HEADER, STAGING_FULCIO_URL,
};
pub use error::{Error, Result, SctError};
pub use sct::{
    HashAlgorithm, LogEntryType, SignatureAlgorithm, SignedCertificateTimestamp, Version,
};
pub use x509_cert::Certificate;
