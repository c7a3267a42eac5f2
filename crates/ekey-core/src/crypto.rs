//! Signing and verification primitives
//!
//! The issuer's key sits behind the [`KeyProvider`] trait so that KMS- or
//! HSM-backed deployments can supply their own implementation; the provider
//! signs a pre-assembled JWS signing input and never exposes private
//! material. [`LocalKeyProvider`] is the in-process implementation holding
//! either a P-256 key (ES256) or an Ed25519 key (EdDSA).
//!
//! JWS signatures are raw: ES256 is the 64-byte `r || s` concatenation,
//! EdDSA the 64-byte Ed25519 signature.

use crate::error::{EkeyError, Result};
use crate::jwk::Jwk;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported JWS signing algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SigningAlgorithm {
    /// ECDSA over P-256 with SHA-256
    #[serde(rename = "ES256")]
    Es256,

    /// Ed25519
    #[serde(rename = "EdDSA")]
    EdDsa,
}

impl SigningAlgorithm {
    /// Algorithm name as it appears in the JWS `alg` header
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Es256 => "ES256",
            Self::EdDsa => "EdDSA",
        }
    }
}

impl fmt::Display for SigningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SigningAlgorithm {
    type Err = EkeyError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ES256" => Ok(Self::Es256),
            "EdDSA" => Ok(Self::EdDsa),
            other => Err(EkeyError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

/// Issuer signing key abstraction
///
/// `sign` receives the pre-assembled JWS signing input
/// (`b64(header).b64(payload)`) and returns the raw signature bytes.
/// `public_jwk` is stable for the lifetime of a key version.
pub trait KeyProvider: Send + Sync {
    /// Sign a JWS signing input with the provider's private key
    fn sign(&self, signing_input: &[u8]) -> Result<Vec<u8>>;

    /// Public key for verifier consumption
    fn public_jwk(&self) -> Jwk;

    /// The algorithm this provider signs with, fixed per instance
    fn algorithm(&self) -> SigningAlgorithm;
}

enum KeyMaterial {
    Es256(p256::ecdsa::SigningKey),
    Ed25519(ed25519_dalek::SigningKey),
}

/// In-process key provider holding the private key in memory
pub struct LocalKeyProvider {
    /// Key version identifier
    kid: String,
    material: KeyMaterial,
}

impl fmt::Debug for LocalKeyProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalKeyProvider")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm())
            .field("private_key", &"[redacted]")
            .finish()
    }
}

impl LocalKeyProvider {
    /// Generate a fresh random key pair for the given algorithm
    pub fn generate(kid: impl Into<String>, algorithm: SigningAlgorithm) -> Self {
        let material = match algorithm {
            SigningAlgorithm::Es256 => {
                KeyMaterial::Es256(p256::ecdsa::SigningKey::random(&mut OsRng))
            }
            SigningAlgorithm::EdDsa => {
                KeyMaterial::Ed25519(ed25519_dalek::SigningKey::generate(&mut OsRng))
            }
        };
        Self {
            kid: kid.into(),
            material,
        }
    }

    /// Create an ES256 provider from a raw P-256 scalar
    pub fn from_es256_bytes(kid: impl Into<String>, bytes: &[u8; 32]) -> Result<Self> {
        let key = p256::ecdsa::SigningKey::from_bytes(bytes.into())
            .map_err(|e| EkeyError::Crypto(format!("invalid P-256 private key: {}", e)))?;
        Ok(Self {
            kid: kid.into(),
            material: KeyMaterial::Es256(key),
        })
    }

    /// Create an EdDSA provider from raw Ed25519 seed bytes
    pub fn from_ed25519_bytes(kid: impl Into<String>, bytes: &[u8; 32]) -> Self {
        Self {
            kid: kid.into(),
            material: KeyMaterial::Ed25519(ed25519_dalek::SigningKey::from_bytes(bytes)),
        }
    }

    /// Key version identifier
    pub fn kid(&self) -> &str {
        &self.kid
    }
}

impl KeyProvider for LocalKeyProvider {
    fn sign(&self, signing_input: &[u8]) -> Result<Vec<u8>> {
        match &self.material {
            KeyMaterial::Es256(key) => {
                use p256::ecdsa::{signature::Signer, Signature};
                let signature: Signature = key.sign(signing_input);
                Ok(signature.to_bytes().to_vec())
            }
            KeyMaterial::Ed25519(key) => {
                use ed25519_dalek::Signer;
                Ok(key.sign(signing_input).to_bytes().to_vec())
            }
        }
    }

    fn public_jwk(&self) -> Jwk {
        match &self.material {
            KeyMaterial::Es256(key) => {
                use p256::elliptic_curve::sec1::ToEncodedPoint;
                // Uncompressed SEC1 point: 0x04 || x || y, 65 bytes
                let point = key.verifying_key().to_encoded_point(false);
                let bytes = point.as_bytes();
                Jwk::Ec {
                    crv: "P-256".into(),
                    x: URL_SAFE_NO_PAD.encode(&bytes[1..33]),
                    y: URL_SAFE_NO_PAD.encode(&bytes[33..65]),
                }
            }
            KeyMaterial::Ed25519(key) => Jwk::Okp {
                crv: "Ed25519".into(),
                x: URL_SAFE_NO_PAD.encode(key.verifying_key().to_bytes()),
            },
        }
    }

    fn algorithm(&self) -> SigningAlgorithm {
        match &self.material {
            KeyMaterial::Es256(_) => SigningAlgorithm::Es256,
            KeyMaterial::Ed25519(_) => SigningAlgorithm::EdDsa,
        }
    }
}

/// Verify a raw JWS signature against a public JWK
///
/// The key type must match the algorithm: EC P-256 for ES256, OKP Ed25519
/// for EdDSA.
pub fn verify_signature(
    jwk: &Jwk,
    algorithm: SigningAlgorithm,
    signing_input: &[u8],
    signature: &[u8],
) -> Result<()> {
    match (jwk, algorithm) {
        (Jwk::Ec { crv, x, y }, SigningAlgorithm::Es256) => {
            if crv != "P-256" {
                return Err(EkeyError::UnsupportedAlgorithm(format!(
                    "EC curve '{}' is not P-256",
                    crv
                )));
            }
            verify_es256(x, y, signing_input, signature)
        }
        (Jwk::Okp { crv, x }, SigningAlgorithm::EdDsa) => {
            if crv != "Ed25519" {
                return Err(EkeyError::UnsupportedAlgorithm(format!(
                    "OKP curve '{}' is not Ed25519",
                    crv
                )));
            }
            verify_ed25519(x, signing_input, signature)
        }
        _ => Err(EkeyError::Crypto(
            "key type does not match signing algorithm".into(),
        )),
    }
}

fn verify_es256(x: &str, y: &str, signing_input: &[u8], signature: &[u8]) -> Result<()> {
    use p256::ecdsa::{signature::Verifier, Signature, VerifyingKey};
    use p256::EncodedPoint;

    let x = decode_coordinate(x, "x")?;
    let y = decode_coordinate(y, "y")?;

    // Uncompressed point: 0x04 || x || y
    let mut uncompressed = [0u8; 65];
    uncompressed[0] = 0x04;
    uncompressed[1..33].copy_from_slice(&x);
    uncompressed[33..65].copy_from_slice(&y);

    let point = EncodedPoint::from_bytes(uncompressed)
        .map_err(|e| EkeyError::Crypto(format!("invalid public key point: {}", e)))?;
    let verifying_key = VerifyingKey::from_encoded_point(&point)
        .map_err(|e| EkeyError::Crypto(format!("invalid P-256 public key: {}", e)))?;
    let signature = Signature::from_slice(signature)
        .map_err(|e| EkeyError::Crypto(format!("invalid ES256 signature format: {}", e)))?;

    verifying_key
        .verify(signing_input, &signature)
        .map_err(|e| EkeyError::Crypto(format!("ES256 verification failed: {}", e)))
}

fn verify_ed25519(x: &str, signing_input: &[u8], signature: &[u8]) -> Result<()> {
    use ed25519_dalek::{Signature, Verifier, VerifyingKey};

    let bytes = decode_coordinate(x, "x")?;
    let verifying_key = VerifyingKey::from_bytes(&bytes)
        .map_err(|e| EkeyError::Crypto(format!("invalid Ed25519 public key: {}", e)))?;
    let signature = Signature::from_slice(signature)
        .map_err(|e| EkeyError::Crypto(format!("invalid EdDSA signature format: {}", e)))?;

    verifying_key
        .verify(signing_input, &signature)
        .map_err(|e| EkeyError::Crypto(format!("EdDSA verification failed: {}", e)))
}

fn decode_coordinate(value: &str, name: &str) -> Result<[u8; 32]> {
    let bytes = URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|e| EkeyError::Malformed(format!("invalid base64url '{}' member: {}", name, e)))?;
    bytes
        .try_into()
        .map_err(|_| EkeyError::Malformed(format!("JWK '{}' member must be 32 bytes", name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify_es256() {
        let provider = LocalKeyProvider::generate("issuer-1", SigningAlgorithm::Es256);
        let input = b"header.payload";

        let sig = provider.sign(input).unwrap();
        assert_eq!(sig.len(), 64);

        verify_signature(&provider.public_jwk(), SigningAlgorithm::Es256, input, &sig).unwrap();
    }

    #[test]
    fn test_sign_and_verify_ed25519() {
        let provider = LocalKeyProvider::generate("issuer-1", SigningAlgorithm::EdDsa);
        let input = b"header.payload";

        let sig = provider.sign(input).unwrap();
        assert_eq!(sig.len(), 64);

        verify_signature(&provider.public_jwk(), SigningAlgorithm::EdDsa, input, &sig).unwrap();
    }

    #[test]
    fn test_verification_fails_with_wrong_key() {
        let signer = LocalKeyProvider::generate("a", SigningAlgorithm::Es256);
        let other = LocalKeyProvider::generate("b", SigningAlgorithm::Es256);

        let sig = signer.sign(b"data").unwrap();
        let result = verify_signature(&other.public_jwk(), SigningAlgorithm::Es256, b"data", &sig);
        assert!(result.is_err());
    }

    #[test]
    fn test_verification_fails_on_tampered_input() {
        let provider = LocalKeyProvider::generate("a", SigningAlgorithm::EdDsa);
        let sig = provider.sign(b"data").unwrap();

        let result =
            verify_signature(&provider.public_jwk(), SigningAlgorithm::EdDsa, b"Data", &sig);
        assert!(result.is_err());
    }

    #[test]
    fn test_key_algorithm_mismatch_rejected() {
        let ec = LocalKeyProvider::generate("a", SigningAlgorithm::Es256);
        let sig = ec.sign(b"data").unwrap();

        let result = verify_signature(&ec.public_jwk(), SigningAlgorithm::EdDsa, b"data", &sig);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_bytes_round_trip() {
        let seed = [7u8; 32];
        let a = LocalKeyProvider::from_ed25519_bytes("k", &seed);
        let b = LocalKeyProvider::from_ed25519_bytes("k", &seed);
        assert_eq!(a.public_jwk(), b.public_jwk());
    }

    #[test]
    fn test_debug_redacts_private_material() {
        let provider = LocalKeyProvider::generate("issuer-1", SigningAlgorithm::Es256);
        let rendered = format!("{:?}", provider);
        assert!(rendered.contains("[redacted]"));
        assert!(rendered.contains("issuer-1"));
    }
}
