//! E-Key token header and claim set

use crate::capability::Capability;
use crate::crypto::SigningAlgorithm;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Value of the `typ` header on every E-Key
pub const TOKEN_TYPE: &str = "EKEY";

/// How the token is bound to the client's key material
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BindMode {
    /// Bound to a client JWK; proof is a signed DPoP-style header
    #[default]
    #[serde(rename = "DPoP")]
    Dpop,

    /// Bound to the client certificate of an authenticated mTLS peer
    #[serde(rename = "mTLS")]
    Mtls,
}

impl fmt::Display for BindMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dpop => f.write_str("DPoP"),
            Self::Mtls => f.write_str("mTLS"),
        }
    }
}

/// Protected header of an E-Key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHeader {
    /// Signing algorithm
    pub alg: SigningAlgorithm,

    /// Token type, always "EKEY"
    pub typ: String,

    /// Binding mode the verifier must enforce
    pub bind: BindMode,
}

impl TokenHeader {
    /// Build the header for a freshly minted token
    pub fn new(alg: SigningAlgorithm, bind: BindMode) -> Self {
        Self {
            alg,
            typ: TOKEN_TYPE.to_string(),
            bind,
        }
    }
}

/// Key confirmation claim (`cnf`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    /// Thumbprint of the bound client key (DPoP) or normalized certificate
    /// fingerprint (mTLS)
    pub jkt: String,
}

/// Claim set carried by an E-Key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Issuer identity URL
    pub iss: String,

    /// Subject identifier
    pub sub: String,

    /// Audience URL
    pub aud: String,

    /// Issued-at, unix seconds
    pub iat: i64,

    /// Expiry, unix seconds; `exp - iat` never exceeds 60
    pub exp: i64,

    /// The capability this token authorizes
    pub cap: Capability,

    /// Key confirmation binding
    pub cnf: Confirmation,

    /// 128-bit replay-tracking nonce, hex-encoded
    pub trace: String,
}
