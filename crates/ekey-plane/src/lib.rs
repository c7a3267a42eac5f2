//! # E-Key Plane
//!
//! The issuance and verification plane for Ephemeral Proof-Bound Capability
//! Keys. It hosts the two state machines that carry the security contract:
//!
//! 1. **Issuer** — validates an issuance request, derives the
//!    key-thumbprint binding, and mints a signed token with a fresh `trace`
//!    nonce, a capability, and an expiry
//! 2. **Verifier** — checks signature, claims, capability/action alignment,
//!    proof of possession, and the clock window, and atomically consumes one
//!    unit of the per-trace usage quota
//!
//! Everything else is an injected collaborator: `UsageStore`, `AuditSink`,
//! `Clock`, `KeyProvider`, and `CertExtractor` are trait objects supplied at
//! construction.
//!
//! ## API Endpoints
//!
//! - `GET /health` - Liveness check
//! - `GET /ready` - Readiness with issuer identity and signing algorithm
//! - `POST /token` - Issue an E-Key
//! - `POST /v1/verify` - Verify a protected request on behalf of a resource
//!   server

pub mod api;
pub mod audit;
pub mod config;
pub mod issuer;
pub mod mtls;
pub mod usage;
pub mod verifier;

pub use api::{create_router, AppState};
pub use audit::{AuditEvent, AuditOutcome, AuditSink, MemoryAuditSink, NullAuditSink, TracingAuditSink};
pub use config::PlaneConfig;
pub use issuer::{IssueError, IssueRequest, Issuer, TokenResponse};
pub use mtls::{normalize_fingerprint, CertExtractor, ClientCertificate, StaticCertExtractor};
pub use usage::{MemoryUsageStore, UsageErrorKind, UsageStore, UsageStoreError};
pub use verifier::{VerificationResult, Verifier, VerifyError, VerifyRequest};
