//! E-Key issuance
//!
//! The issuer validates an issuance request, derives the key-thumbprint
//! binding, and mints a signed token carrying a fresh `trace` nonce, the
//! capability, and an expiry. Tokens are never persisted by the issuer; the
//! usage store only learns a trace on first verification.

use crate::config::PlaneConfig;
use crate::mtls::normalize_fingerprint;
use ekey_core::{
    encode_token, generate_trace, BindMode, Capability, Clock, Confirmation, EkeyError, Jwk,
    KeyProvider, TokenClaims, TokenHeader,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use url::Url;

/// Issuance request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueRequest {
    /// Subject identifier, non-empty
    pub sub: String,

    /// Audience URL
    pub aud: String,

    /// Capability the token will authorize
    pub cap: Capability,

    /// Token lifetime in seconds, 1..=60
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    /// Binding mode, DPoP unless stated
    #[serde(default)]
    pub bind: BindMode,

    /// Client public key; required when `bind` is DPoP
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwk: Option<Jwk>,

    /// Client certificate fingerprint; required when `bind` is mTLS
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cert_fingerprint: Option<String>,
}

fn default_ttl() -> u32 {
    crate::config::DEFAULT_MAX_TTL_SECONDS
}

/// Issuance response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// The minted E-Key, compact JWS
    pub token: String,

    /// Trace nonce of the token
    pub trace: String,

    /// Expiry, unix seconds
    pub expires_at: i64,

    /// Lifetime granted, seconds
    pub expires_in: u32,

    /// Key confirmation echoed from the token
    pub cnf: Confirmation,
}

/// Issuance failure modes
#[derive(Debug, Error)]
pub enum IssueError {
    /// Request field failed schema or refinement validation
    #[error("invalid request: {field}: {message}")]
    InvalidRequest {
        /// Request field that failed
        field: String,
        /// What was wrong with it
        message: String,
    },

    /// The binding material required by `bind` is missing or unusable
    #[error("invalid binding: {0}")]
    InvalidBinding(String),

    /// The key provider refused to sign
    #[error("signer failure: {0}")]
    SignerFailure(#[from] EkeyError),
}

impl IssueError {
    fn invalid(field: &str, message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// The issuance state machine
pub struct Issuer {
    key_provider: Arc<dyn KeyProvider>,
    clock: Arc<dyn Clock>,
    config: PlaneConfig,
}

impl Issuer {
    /// Create an issuer over the given signing key and clock
    pub fn new(
        key_provider: Arc<dyn KeyProvider>,
        clock: Arc<dyn Clock>,
        config: PlaneConfig,
    ) -> Self {
        Self {
            key_provider,
            clock,
            config,
        }
    }

    /// Validate a request and mint a signed token
    pub fn issue(&self, request: IssueRequest) -> Result<TokenResponse, IssueError> {
        if request.sub.is_empty() {
            return Err(IssueError::invalid("sub", "must be non-empty"));
        }
        if Url::parse(&request.aud).is_err() {
            return Err(IssueError::invalid("aud", "must be a valid URL"));
        }
        request
            .cap
            .parse_action()
            .map_err(|e| IssueError::invalid("cap.action", e.to_string()))?;
        if request.cap.limit < 1 || request.cap.limit > self.config.max_limit {
            return Err(IssueError::invalid(
                "cap.limit",
                format!("must be within 1..={}", self.config.max_limit),
            ));
        }
        if request.ttl < 1 || request.ttl > self.config.max_ttl_seconds {
            return Err(IssueError::invalid(
                "ttl",
                format!("must be within 1..={}", self.config.max_ttl_seconds),
            ));
        }

        let jkt = match request.bind {
            BindMode::Dpop => {
                let jwk = request
                    .jwk
                    .as_ref()
                    .ok_or_else(|| IssueError::InvalidBinding("DPoP binding requires a jwk".into()))?;
                jwk.thumbprint()
            }
            BindMode::Mtls => {
                let fingerprint = request.cert_fingerprint.as_deref().ok_or_else(|| {
                    IssueError::InvalidBinding("mTLS binding requires a cert_fingerprint".into())
                })?;
                normalize_fingerprint(fingerprint).map_err(|_| {
                    IssueError::InvalidBinding("cert_fingerprint is not a hex digest".into())
                })?
            }
        };

        let now = self.clock.now_unix();
        let exp = now + i64::from(request.ttl);
        let trace = generate_trace();

        let claims = TokenClaims {
            iss: self.config.issuer_url.clone(),
            sub: request.sub.clone(),
            aud: request.aud.clone(),
            iat: now,
            exp,
            cap: request.cap,
            cnf: Confirmation { jkt: jkt.clone() },
            trace: trace.clone(),
        };
        let header = TokenHeader::new(self.key_provider.algorithm(), request.bind);

        let token = encode_token(&header, &claims, self.key_provider.as_ref())?;

        info!(
            sub = %request.sub,
            bind = %request.bind,
            action = %claims.cap.action,
            %trace,
            expires_in = request.ttl,
            "issued token"
        );

        Ok(TokenResponse {
            token,
            trace,
            expires_at: exp,
            expires_in: request.ttl,
            cnf: Confirmation { jkt },
        })
    }
}
