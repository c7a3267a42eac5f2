//! JSON Web Key representation and RFC 7638 thumbprints
//!
//! Only the two key types the system signs with are admitted: EC P-256
//! (ES256) and OKP Ed25519 (EdDSA). Any other `kty` fails deserialization,
//! which is the only entry point for untrusted key material.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Public key in JWK form, tagged by `kty`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kty")]
pub enum Jwk {
    /// Elliptic curve public key (P-256)
    #[serde(rename = "EC")]
    Ec {
        /// Curve name, "P-256" for ES256
        crv: String,
        /// X coordinate, base64url without padding
        x: String,
        /// Y coordinate, base64url without padding
        y: String,
    },

    /// Octet key pair public key (Ed25519)
    #[serde(rename = "OKP")]
    Okp {
        /// Curve name, "Ed25519" for EdDSA
        crv: String,
        /// Public key bytes, base64url without padding
        x: String,
    },
}

impl Jwk {
    /// Compute the RFC 7638 canonical thumbprint
    ///
    /// The required members are serialized in lexicographic order with no
    /// whitespace (EC: crv, kty, x, y; OKP: crv, kty, x), hashed with
    /// SHA-256, and base64url-encoded without padding. Members beyond the
    /// required set never contribute, so equivalent keys with reordered or
    /// extra JSON members produce the same thumbprint.
    pub fn thumbprint(&self) -> String {
        // serde_json maps are sorted by key, so member order is canonical
        let canonical = match self {
            Jwk::Ec { crv, x, y } => serde_json::json!({
                "crv": crv,
                "kty": "EC",
                "x": x,
                "y": y,
            }),
            Jwk::Okp { crv, x } => serde_json::json!({
                "crv": crv,
                "kty": "OKP",
                "x": x,
            }),
        };

        let mut hasher = Sha256::new();
        hasher.update(canonical.to_string().as_bytes());
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Example DPoP key from RFC 9449; the expected thumbprint is the jkt
    // the RFC binds to it.
    fn rfc9449_key() -> Jwk {
        Jwk::Ec {
            crv: "P-256".into(),
            x: "l8tFrhx-34tV3hRICRDY9zCkDlpBhF42UQUfWVAWBFs".into(),
            y: "9VE4jf_Ok_o64zbTTlcuNJajHmt6v9TDVrU0CdvGRDA".into(),
        }
    }

    #[test]
    fn test_thumbprint_rfc9449_vector() {
        assert_eq!(
            rfc9449_key().thumbprint(),
            "0ZcOCORZNYy-DWpqq30jZyJGHTN0d2HglBV3uiguA4I"
        );
    }

    #[test]
    fn test_thumbprint_deterministic() {
        let jwk = rfc9449_key();
        assert_eq!(jwk.thumbprint(), jwk.thumbprint());
    }

    #[test]
    fn test_thumbprint_ignores_member_order_and_extras() {
        // Same key, members reordered, with non-required members present
        let a: Jwk = serde_json::from_str(
            r#"{"y":"9VE4jf_Ok_o64zbTTlcuNJajHmt6v9TDVrU0CdvGRDA",
                "use":"sig","alg":"ES256","kid":"client-1",
                "x":"l8tFrhx-34tV3hRICRDY9zCkDlpBhF42UQUfWVAWBFs",
                "crv":"P-256","kty":"EC"}"#,
        )
        .unwrap();

        assert_eq!(a.thumbprint(), rfc9449_key().thumbprint());
    }

    #[test]
    fn test_thumbprint_differs_across_keys() {
        let other = Jwk::Ec {
            crv: "P-256".into(),
            x: "9VE4jf_Ok_o64zbTTlcuNJajHmt6v9TDVrU0CdvGRDA".into(),
            y: "l8tFrhx-34tV3hRICRDY9zCkDlpBhF42UQUfWVAWBFs".into(),
        };
        assert_ne!(other.thumbprint(), rfc9449_key().thumbprint());
    }

    #[test]
    fn test_okp_thumbprint_omits_y() {
        let jwk = Jwk::Okp {
            crv: "Ed25519".into(),
            x: "11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo".into(),
        };
        // Distinct from an EC key reusing the same x
        let ec = Jwk::Ec {
            crv: "Ed25519".into(),
            x: "11qYAYKxCrfVS_7TyWQHOg7hcvPapiMlrwIaaPcHURo".into(),
            y: String::new(),
        };
        assert_ne!(jwk.thumbprint(), ec.thumbprint());
    }

    #[test]
    fn test_unsupported_kty_rejected() {
        let result: Result<Jwk, _> = serde_json::from_str(
            r#"{"kty":"RSA","n":"abc","e":"AQAB"}"#,
        );
        assert!(result.is_err());
    }
}
