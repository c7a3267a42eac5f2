//! mTLS client certificate extraction
//!
//! In mTLS binding mode the token's `cnf.jkt` carries the normalized SHA-256
//! fingerprint of the client certificate DER. The verifier obtains the
//! presented certificate through [`CertExtractor`], a collaborator bound to
//! the authenticated peer of the current connection; TLS socket plumbing
//! itself lives outside this crate.

use std::fmt::Debug;
use thiserror::Error;

/// Client certificate facts extracted from an authenticated peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCertificate {
    /// SHA-256 fingerprint of the certificate DER, hex
    pub fingerprint: String,

    /// Certificate subject, if available
    pub subject: Option<String>,

    /// SPIFFE ID from the SAN, if present
    pub spiffe_id: Option<String>,
}

impl ClientCertificate {
    /// Build a certificate record from a fingerprint alone
    pub fn from_fingerprint(fingerprint: impl Into<String>) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            subject: None,
            spiffe_id: None,
        }
    }
}

/// Access to the presented client certificate
///
/// Returns `None` when the peer did not present a certificate or the
/// handshake did not authenticate it; callers translate that into an
/// invalid-request error.
pub trait CertExtractor: Send + Sync + Debug {
    /// Certificate of the authenticated peer, if any
    fn peer_certificate(&self) -> Option<ClientCertificate>;
}

/// Extractor returning a fixed certificate, for tests and single-peer tools
#[derive(Debug, Clone, Default)]
pub struct StaticCertExtractor {
    certificate: Option<ClientCertificate>,
}

impl StaticCertExtractor {
    /// Extractor that reports no peer certificate
    pub fn none() -> Self {
        Self { certificate: None }
    }

    /// Extractor that always reports the given certificate
    pub fn with(certificate: ClientCertificate) -> Self {
        Self {
            certificate: Some(certificate),
        }
    }
}

impl CertExtractor for StaticCertExtractor {
    fn peer_certificate(&self) -> Option<ClientCertificate> {
        self.certificate.clone()
    }
}

/// Fingerprint is not hex after separator removal
#[derive(Debug, Clone, Error)]
#[error("fingerprint is not a hex digest")]
pub struct InvalidFingerprint;

/// Normalize a certificate fingerprint: strip `:` separators, lowercase
///
/// Preserves the digest bytes exactly; anything that is not hex once the
/// separators are gone is rejected.
pub fn normalize_fingerprint(raw: &str) -> Result<String, InvalidFingerprint> {
    let normalized: String = raw
        .chars()
        .filter(|&c| c != ':')
        .map(|c| c.to_ascii_lowercase())
        .collect();

    if normalized.is_empty() || !normalized.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(InvalidFingerprint);
    }
    Ok(normalized)
}
