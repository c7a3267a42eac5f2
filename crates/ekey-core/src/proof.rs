//! DPoP-style proof-of-possession tokens
//!
//! A proof is a separately signed compact JWS whose header carries the
//! client's public JWK and whose payload binds the proof to one HTTP request
//! (`htm`, `htu`), one token (`nonce` equals the token's trace), and one
//! moment in time (`iat`). Clients build proofs with [`build_proof`];
//! verifiers parse with [`PopProof::parse`] and check the signature against
//! the embedded key.

use crate::crypto::{self, KeyProvider, SigningAlgorithm};
use crate::error::{EkeyError, Result};
use crate::jwk::Jwk;
use crate::token::{decode_segment, encode_segment, split_compact};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use url::Url;

/// Value of the `typ` header on a DPoP proof (compared case-insensitively)
pub const PROOF_TYPE: &str = "dpop+jwt";

/// Protected header of a proof
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofHeader {
    /// Signing algorithm of the client key
    pub alg: SigningAlgorithm,

    /// Proof type, "dpop+jwt"
    pub typ: String,

    /// The client's public key, embedded for verification
    pub jwk: Jwk,
}

/// Claim set of a proof
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofPayload {
    /// Uppercase HTTP method of the bound request
    pub htm: String,

    /// Canonical target URI: origin + pathname, no query or fragment
    pub htu: String,

    /// Issued-at, unix seconds
    pub iat: i64,

    /// The bound token's trace
    pub nonce: String,

    /// Unique proof identifier
    pub jti: String,
}

/// A parsed proof whose signature has not yet been checked
#[derive(Debug, Clone)]
pub struct PopProof {
    /// Parsed protected header
    pub header: ProofHeader,

    /// Parsed claim set
    pub payload: ProofPayload,

    signing_input: String,
    signature: Vec<u8>,
}

impl PopProof {
    /// Parse a compact JWS proof
    ///
    /// Does NOT verify the signature; call [`PopProof::verify_signature`].
    pub fn parse(compact: &str) -> Result<Self> {
        let (h, p, s) = split_compact(compact)?;

        let header: ProofHeader = decode_segment(h)?;
        let payload: ProofPayload = decode_segment(p)?;
        let signature = URL_SAFE_NO_PAD.decode(s)?;

        Ok(Self {
            header,
            payload,
            signing_input: format!("{}.{}", h, p),
            signature,
        })
    }

    /// Verify the proof signature against the JWK embedded in its header
    pub fn verify_signature(&self) -> Result<()> {
        crypto::verify_signature(
            &self.header.jwk,
            self.header.alg,
            self.signing_input.as_bytes(),
            &self.signature,
        )
    }

    /// RFC 7638 thumbprint of the embedded client key
    pub fn thumbprint(&self) -> String {
        self.header.jwk.thumbprint()
    }
}

/// Build and sign a proof for one HTTP request
///
/// `url` is the absolute request URL; query and fragment are stripped when
/// deriving `htu`. `trace` is the trace claim of the token the proof
/// accompanies.
pub fn build_proof(
    provider: &dyn KeyProvider,
    method: &str,
    url: &str,
    trace: &str,
    now: i64,
) -> Result<String> {
    let header = ProofHeader {
        alg: provider.algorithm(),
        typ: PROOF_TYPE.to_string(),
        jwk: provider.public_jwk(),
    };

    let mut jti = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut jti);

    let payload = ProofPayload {
        htm: method.to_ascii_uppercase(),
        htu: canonical_htu(url)?,
        iat: now,
        nonce: trace.to_string(),
        jti: hex::encode(jti),
    };

    let signing_input = format!("{}.{}", encode_segment(&header)?, encode_segment(&payload)?);
    let signature = provider.sign(signing_input.as_bytes())?;
    Ok(format!(
        "{}.{}",
        signing_input,
        URL_SAFE_NO_PAD.encode(signature)
    ))
}

/// Canonical `htu` for a request URL: origin + pathname, dropping query and
/// fragment
pub fn canonical_htu(url: &str) -> Result<String> {
    let parsed = Url::parse(url)?;
    let origin = parsed.origin();
    if !matches!(origin, url::Origin::Tuple(..)) {
        return Err(EkeyError::Malformed(format!(
            "URL '{}' has no usable origin",
            url
        )));
    }
    Ok(format!("{}{}", origin.ascii_serialization(), parsed.path()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::LocalKeyProvider;

    #[test]
    fn test_canonical_htu_strips_query_and_fragment() {
        assert_eq!(
            canonical_htu("https://api.example.com/payments?id=1#frag").unwrap(),
            "https://api.example.com/payments"
        );
    }

    #[test]
    fn test_canonical_htu_keeps_explicit_port() {
        assert_eq!(
            canonical_htu("http://localhost:8080/token").unwrap(),
            "http://localhost:8080/token"
        );
    }

    #[test]
    fn test_canonical_htu_drops_default_port() {
        assert_eq!(
            canonical_htu("https://api.example.com:443/x").unwrap(),
            "https://api.example.com/x"
        );
    }

    #[test]
    fn test_canonical_htu_rejects_opaque_origin() {
        assert!(canonical_htu("data:text/plain,hello").is_err());
        assert!(canonical_htu("not a url").is_err());
    }

    #[test]
    fn test_build_and_parse_round_trip() {
        let client = LocalKeyProvider::generate("client", SigningAlgorithm::Es256);
        let trace = "deadbeefdeadbeefdeadbeefdeadbeef";

        let compact = build_proof(
            &client,
            "post",
            "https://api.example.com/payments?x=1",
            trace,
            1_700_000_000,
        )
        .unwrap();

        let proof = PopProof::parse(&compact).unwrap();
        assert_eq!(proof.header.typ, PROOF_TYPE);
        assert_eq!(proof.payload.htm, "POST");
        assert_eq!(proof.payload.htu, "https://api.example.com/payments");
        assert_eq!(proof.payload.nonce, trace);
        assert_eq!(proof.payload.jti.len(), 32);

        proof.verify_signature().unwrap();
        assert_eq!(proof.thumbprint(), client.public_jwk().thumbprint());
    }

    #[test]
    fn test_proof_round_trip_eddsa() {
        let client = LocalKeyProvider::generate("client", SigningAlgorithm::EdDsa);
        let compact = build_proof(&client, "GET", "https://a.example.com/x", "00", 1).unwrap();

        let proof = PopProof::parse(&compact).unwrap();
        proof.verify_signature().unwrap();
    }

    #[test]
    fn test_tampered_proof_signature_rejected() {
        let client = LocalKeyProvider::generate("client", SigningAlgorithm::Es256);
        let compact = build_proof(&client, "GET", "https://a.example.com/x", "00", 1).unwrap();

        // Swap the embedded key for a different one; the signature no longer
        // matches the header segment it signs over
        let intruder = LocalKeyProvider::generate("intruder", SigningAlgorithm::Es256);
        let (_, p, s) = split_compact(&compact).unwrap();
        let forged_header = ProofHeader {
            alg: SigningAlgorithm::Es256,
            typ: PROOF_TYPE.to_string(),
            jwk: intruder.public_jwk(),
        };
        let forged = format!("{}.{}.{}", encode_segment(&forged_header).unwrap(), p, s);

        let proof = PopProof::parse(&forged).unwrap();
        assert!(proof.verify_signature().is_err());
    }
}
