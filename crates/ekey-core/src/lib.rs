//! # E-Key Core
//!
//! Core types and cryptographic primitives for Ephemeral Proof-Bound
//! Capability Keys (E-Keys): short-lived signed tokens bound to a client key
//! and constrained to a single HTTP action.
//!
//! ## Key Concepts
//!
//! - **E-Key**: a compact JWS minted by the issuer, carrying a capability,
//!   an expiry, a key-confirmation thumbprint (`cnf.jkt`), and a unique
//!   `trace` nonce for replay accounting
//! - **PoP proof**: a separately signed DPoP-style token demonstrating the
//!   caller holds the key the E-Key is bound to
//! - **Capability**: `METHOD:/path` action plus a consumption limit
//!
//! This crate is pure: no I/O, no async, no clock reads outside the
//! injectable [`clock::Clock`]. The issuance and verification state machines
//! live in `ekey-plane`.

pub mod capability;
pub mod claims;
pub mod clock;
pub mod crypto;
pub mod error;
pub mod jwk;
pub mod proof;
pub mod token;

pub use capability::{Capability, DEFAULT_LIMIT};
pub use claims::{BindMode, Confirmation, TokenClaims, TokenHeader, TOKEN_TYPE};
pub use clock::{Clock, FixedClock, SystemClock};
pub use crypto::{KeyProvider, LocalKeyProvider, SigningAlgorithm};
pub use error::{EkeyError, Result};
pub use jwk::Jwk;
pub use proof::{build_proof, canonical_htu, PopProof, ProofHeader, ProofPayload, PROOF_TYPE};
pub use token::{encode_token, generate_trace, DecodedToken};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
