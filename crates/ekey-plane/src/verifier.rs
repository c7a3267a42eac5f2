//! E-Key verification
//!
//! The verifier is the admission gate for protected requests. It runs a
//! fixed sequence of checks — presence, token signature and standard claims,
//! capability shape, action alignment, trace presence, usage consumption,
//! proof of possession — and each failure short-circuits the rest. Usage is
//! consumed BEFORE the proof is checked: a replayed token trips the usage
//! store no matter what proof accompanies it, and a forged proof still costs
//! the attacker a unit of the limit they cannot spend (producing a valid
//! proof requires the private key they lack).

use crate::audit::{AuditEvent, AuditOutcome, AuditSink};
use crate::config::PlaneConfig;
use crate::mtls::{normalize_fingerprint, CertExtractor};
use crate::usage::{UsageErrorKind, UsageStore};
use ekey_core::{
    canonical_htu, BindMode, Capability, Clock, DecodedToken, KeyProvider, PopProof, TokenClaims,
    PROOF_TYPE, TOKEN_TYPE,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use url::Url;

/// A protected request presented for verification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyRequest {
    /// The E-Key from the `Authorization: EKey <token>` header
    pub token: Option<String>,

    /// The proof from the `DPoP` header; required in DPoP binding mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pop: Option<String>,

    /// HTTP method of the request
    pub method: String,

    /// Absolute request URL
    pub url: String,
}

/// Facts established by a successful verification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Token subject
    pub sub: String,

    /// Token audience
    pub aud: String,

    /// The capability that admitted the request
    pub cap: Capability,

    /// Trace of the consumed token
    pub trace: String,
}

/// Verification failure taxonomy
#[derive(Debug, Clone, Error)]
pub enum VerifyError {
    /// Missing token or proof, or malformed inputs at the edge
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Signature, issuer/audience, or claim-shape failure
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// Token past `exp` (with tolerance), or the usage store reports expiry
    #[error("token expired")]
    ExpiredToken,

    /// Request method or path does not match the capability
    #[error("capability mismatch: {0}")]
    CapabilityMismatch(String),

    /// Usage limit for the trace is exhausted
    #[error("replay detected")]
    ReplayDetected,

    /// Proof-of-possession checks failed
    #[error("invalid proof: {0}")]
    InvalidProof(String),
}

impl VerifyError {
    /// Machine-readable error kind
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::InvalidToken(_) => "invalid_token",
            Self::ExpiredToken => "expired_token",
            Self::CapabilityMismatch(_) => "capability_mismatch",
            Self::ReplayDetected => "replay_detected",
            Self::InvalidProof(_) => "invalid_proof",
        }
    }
}

/// The verification state machine
///
/// Polymorphic over its collaborators: key provider (issuer public key),
/// usage store, clock, audit sink, and certificate extractor are all
/// injected.
pub struct Verifier {
    key_provider: Arc<dyn KeyProvider>,
    usage: Arc<dyn UsageStore>,
    clock: Arc<dyn Clock>,
    audit: Arc<dyn AuditSink>,
    certs: Arc<dyn CertExtractor>,
    config: PlaneConfig,
}

impl Verifier {
    /// Create a verifier over the given collaborators
    pub fn new(
        key_provider: Arc<dyn KeyProvider>,
        usage: Arc<dyn UsageStore>,
        clock: Arc<dyn Clock>,
        audit: Arc<dyn AuditSink>,
        certs: Arc<dyn CertExtractor>,
        config: PlaneConfig,
    ) -> Self {
        Self {
            key_provider,
            usage,
            clock,
            audit,
            certs,
            config,
        }
    }

    /// Verify a protected request; only a complete success admits it
    ///
    /// Usage is consumed at the point marked below, before proof
    /// verification. If the surrounding request is cancelled between that
    /// consumption and the proof check, one unit of the limit is lost; the
    /// request was never admitted, so the loss is in the conservative
    /// direction.
    pub async fn verify(
        &self,
        request: &VerifyRequest,
    ) -> Result<VerificationResult, VerifyError> {
        // 1. Presence
        let token = request
            .token
            .as_deref()
            .ok_or_else(|| VerifyError::InvalidRequest("missing token".into()))?;
        let decoded =
            DecodedToken::parse(token).map_err(|e| VerifyError::InvalidToken(e.to_string()))?;
        if decoded.header.typ != TOKEN_TYPE {
            return Err(VerifyError::InvalidToken(format!(
                "unexpected token typ '{}'",
                decoded.header.typ
            )));
        }
        let pop = match decoded.header.bind {
            BindMode::Dpop => Some(
                request
                    .pop
                    .as_deref()
                    .ok_or_else(|| VerifyError::InvalidRequest("missing DPoP proof".into()))?,
            ),
            BindMode::Mtls => None,
        };

        // 2. Token signature and standard claims
        decoded
            .verify_signature(&self.key_provider.public_jwk())
            .map_err(|_| VerifyError::InvalidToken("signature verification failed".into()))?;
        let claims = &decoded.claims;
        if claims.iss != self.config.issuer_url {
            return Err(VerifyError::InvalidToken("issuer mismatch".into()));
        }
        if claims.aud != self.config.audience {
            return Err(VerifyError::InvalidToken("audience mismatch".into()));
        }
        let now = self.clock.now_unix();
        if now > claims.exp + self.config.clock_tolerance_seconds {
            return Err(VerifyError::ExpiredToken);
        }

        // 3. Capability presence
        let (cap_method, cap_path) = claims
            .cap
            .parse_action()
            .map_err(|e| VerifyError::InvalidToken(e.to_string()))?;

        // 4. Action alignment; paths compare as exact strings, no folding
        let url = Url::parse(&request.url)
            .map_err(|_| VerifyError::InvalidRequest("request url is not absolute".into()))?;
        let method = request.method.to_ascii_uppercase();
        if method != cap_method || url.path() != cap_path {
            let detail = format!(
                "{} {} is not authorized by '{}'",
                method,
                url.path(),
                claims.cap.action
            );
            self.deny(AuditOutcome::CapMismatch, claims, &detail, now);
            return Err(VerifyError::CapabilityMismatch(detail));
        }

        // 5. Trace presence
        if claims.trace.is_empty() {
            return Err(VerifyError::InvalidToken("empty trace".into()));
        }

        // 6. Usage consumption (before PoP verification)
        if let Err(err) = self
            .usage
            .consume(&claims.trace, claims.cap.limit, claims.exp, now)
            .await
        {
            return Err(match err.kind {
                UsageErrorKind::TokenExpired => {
                    self.deny(AuditOutcome::Expired, claims, "usage store expiry", now);
                    VerifyError::ExpiredToken
                }
                UsageErrorKind::LimitExhausted => {
                    self.deny(AuditOutcome::ReplayBlocked, claims, "limit exhausted", now);
                    VerifyError::ReplayDetected
                }
            });
        }

        // 7. Proof of possession, branching on the token's binding mode
        let pop_check = match decoded.header.bind {
            BindMode::Dpop => {
                let Some(pop) = pop else {
                    return Err(VerifyError::InvalidRequest("missing DPoP proof".into()));
                };
                self.check_dpop(pop, &method, &request.url, claims, now)
            }
            BindMode::Mtls => self.check_mtls(claims),
        };
        if let Err(err) = pop_check {
            if let VerifyError::InvalidProof(reason) = &err {
                self.deny(AuditOutcome::InvalidProof, claims, reason, now);
            }
            return Err(err);
        }

        // 8. Admit
        self.audit.record(AuditEvent {
            sub: Some(claims.sub.clone()),
            trace: Some(claims.trace.clone()),
            outcome: AuditOutcome::Allowed,
            reason: None,
            timestamp: now,
        });

        Ok(VerificationResult {
            sub: claims.sub.clone(),
            aud: claims.aud.clone(),
            cap: claims.cap.clone(),
            trace: claims.trace.clone(),
        })
    }

    fn check_dpop(
        &self,
        pop: &str,
        method: &str,
        request_url: &str,
        claims: &TokenClaims,
        now: i64,
    ) -> Result<(), VerifyError> {
        let proof =
            PopProof::parse(pop).map_err(|e| VerifyError::InvalidProof(e.to_string()))?;

        if !proof.header.typ.eq_ignore_ascii_case(PROOF_TYPE) {
            return Err(VerifyError::InvalidProof(format!(
                "proof typ '{}' is not '{}'",
                proof.header.typ, PROOF_TYPE
            )));
        }

        proof
            .verify_signature()
            .map_err(|_| VerifyError::InvalidProof("proof signature verification failed".into()))?;

        if proof.payload.htm != method {
            return Err(VerifyError::InvalidProof("htm does not match request".into()));
        }
        let expected_htu = canonical_htu(request_url)
            .map_err(|_| VerifyError::InvalidRequest("request url is not absolute".into()))?;
        if proof.payload.htu != expected_htu {
            return Err(VerifyError::InvalidProof("htu does not match request".into()));
        }
        if proof.payload.nonce != claims.trace {
            return Err(VerifyError::InvalidProof(
                "proof nonce does not match token trace".into(),
            ));
        }
        if (now - proof.payload.iat).abs() > self.config.clock_tolerance_seconds {
            return Err(VerifyError::InvalidProof(
                "proof iat outside the accepted window".into(),
            ));
        }

        if claims.cnf.jkt.is_empty() {
            return Err(VerifyError::InvalidToken("missing cnf.jkt".into()));
        }
        if proof.thumbprint() != claims.cnf.jkt {
            return Err(VerifyError::InvalidProof(
                "proof key does not match token binding".into(),
            ));
        }

        Ok(())
    }

    fn check_mtls(&self, claims: &TokenClaims) -> Result<(), VerifyError> {
        let certificate = self.certs.peer_certificate().ok_or_else(|| {
            VerifyError::InvalidRequest("no authenticated client certificate".into())
        })?;
        let fingerprint = normalize_fingerprint(&certificate.fingerprint)
            .map_err(|_| VerifyError::InvalidProof("presented fingerprint is not hex".into()))?;

        if claims.cnf.jkt.is_empty() {
            return Err(VerifyError::InvalidToken("missing cnf.jkt".into()));
        }
        if fingerprint != claims.cnf.jkt {
            return Err(VerifyError::InvalidProof(
                "certificate fingerprint does not match token binding".into(),
            ));
        }

        Ok(())
    }

    fn deny(&self, outcome: AuditOutcome, claims: &TokenClaims, reason: &str, now: i64) {
        self.audit.record(AuditEvent {
            sub: Some(claims.sub.clone()),
            trace: Some(claims.trace.clone()),
            outcome,
            reason: Some(reason.to_string()),
            timestamp: now,
        });
    }
}
