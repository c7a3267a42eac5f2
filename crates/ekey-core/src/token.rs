//! Compact JWS assembly and parsing for E-Keys
//!
//! Wire format is three base64url segments without padding,
//! `b64(header).b64(payload).b64(signature)`, signed over the first two
//! segments joined by `.`.

use crate::claims::{TokenClaims, TokenHeader};
use crate::crypto::{self, KeyProvider};
use crate::error::{EkeyError, Result};
use crate::jwk::Jwk;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Generate a fresh 128-bit trace nonce, hex-encoded (32 chars)
pub fn generate_trace() -> String {
    let mut bytes = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub(crate) fn encode_segment<T: Serialize>(value: &T) -> Result<String> {
    Ok(URL_SAFE_NO_PAD.encode(serde_json::to_vec(value)?))
}

pub(crate) fn decode_segment<T: DeserializeOwned>(segment: &str) -> Result<T> {
    let bytes = URL_SAFE_NO_PAD.decode(segment)?;
    Ok(serde_json::from_slice(&bytes)?)
}

pub(crate) fn split_compact(compact: &str) -> Result<(&str, &str, &str)> {
    let mut parts = compact.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(h), Some(p), Some(s), None) => Ok((h, p, s)),
        _ => Err(EkeyError::Malformed(
            "compact JWS must have exactly three segments".into(),
        )),
    }
}

/// Assemble and sign an E-Key as a compact JWS
pub fn encode_token(
    header: &TokenHeader,
    claims: &TokenClaims,
    provider: &dyn KeyProvider,
) -> Result<String> {
    let signing_input = format!("{}.{}", encode_segment(header)?, encode_segment(claims)?);
    let signature = provider.sign(signing_input.as_bytes())?;
    Ok(format!(
        "{}.{}",
        signing_input,
        URL_SAFE_NO_PAD.encode(signature)
    ))
}

/// A parsed E-Key whose signature has not yet been checked
#[derive(Debug, Clone)]
pub struct DecodedToken {
    /// Parsed protected header
    pub header: TokenHeader,

    /// Parsed claim set
    pub claims: TokenClaims,

    signing_input: String,
    signature: Vec<u8>,
}

impl DecodedToken {
    /// Parse a compact JWS into header and claims
    ///
    /// This does NOT verify the signature; call [`DecodedToken::verify_signature`]
    /// with the issuer's public JWK.
    pub fn parse(compact: &str) -> Result<Self> {
        let (h, p, s) = split_compact(compact)?;

        let header: TokenHeader = decode_segment(h)?;
        let claims: TokenClaims = decode_segment(p)?;
        let signature = URL_SAFE_NO_PAD.decode(s)?;

        Ok(Self {
            header,
            claims,
            signing_input: format!("{}.{}", h, p),
            signature,
        })
    }

    /// Verify the token signature against the issuer's public JWK
    pub fn verify_signature(&self, issuer_jwk: &Jwk) -> Result<()> {
        crypto::verify_signature(
            issuer_jwk,
            self.header.alg,
            self.signing_input.as_bytes(),
            &self.signature,
        )
    }
}
