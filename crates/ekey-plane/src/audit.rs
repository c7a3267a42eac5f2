//! Audit event emission
//!
//! The verifier reports every admission decision to an [`AuditSink`]. Sinks
//! are fire-and-forget: `record` returns nothing and implementations must
//! swallow their own failures rather than surface them into the verifier's
//! return path.

use serde::Serialize;
use std::fmt::Debug;
use std::sync::Mutex;
use tracing::{info, warn};

/// Outcome of a verification attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    /// Request admitted
    Allowed,
    /// Usage limit exhausted for the trace
    ReplayBlocked,
    /// Token or trace past expiry
    Expired,
    /// Request method/path did not match the capability
    CapMismatch,
    /// Proof-of-possession check failed
    InvalidProof,
}

impl AuditOutcome {
    /// Wire name of the outcome
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Allowed => "allowed",
            Self::ReplayBlocked => "replay_blocked",
            Self::Expired => "expired",
            Self::CapMismatch => "cap_mismatch",
            Self::InvalidProof => "invalid_proof",
        }
    }
}

/// One verification decision
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    /// Subject of the token, when recoverable
    pub sub: Option<String>,

    /// Trace of the token, when recoverable
    pub trace: Option<String>,

    /// Decision outcome
    pub outcome: AuditOutcome,

    /// Short reason detail; never contains signatures or token material
    pub reason: Option<String>,

    /// Unix seconds at emission
    pub timestamp: i64,
}

/// Receiver of verification decisions
pub trait AuditSink: Send + Sync + Debug {
    /// Record one event; must not panic or propagate failure
    fn record(&self, event: AuditEvent);
}

/// Sink that emits structured tracing events
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        match event.outcome {
            AuditOutcome::Allowed => info!(
                sub = event.sub.as_deref().unwrap_or("-"),
                trace = event.trace.as_deref().unwrap_or("-"),
                outcome = event.outcome.as_str(),
                "request admitted"
            ),
            _ => warn!(
                sub = event.sub.as_deref().unwrap_or("-"),
                trace = event.trace.as_deref().unwrap_or("-"),
                outcome = event.outcome.as_str(),
                reason = event.reason.as_deref().unwrap_or("-"),
                "request denied"
            ),
        }
    }
}

/// Sink that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _event: AuditEvent) {}
}

/// Sink that retains events in memory, for inspection in tests and tooling
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all recorded events
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Outcomes in emission order
    pub fn outcomes(&self) -> Vec<AuditOutcome> {
        self.events.lock().unwrap().iter().map(|e| e.outcome).collect()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_wire_names() {
        assert_eq!(AuditOutcome::ReplayBlocked.as_str(), "replay_blocked");
        assert_eq!(
            serde_json::to_string(&AuditOutcome::CapMismatch).unwrap(),
            r#""cap_mismatch""#
        );
    }

    #[test]
    fn test_memory_sink_retains_events() {
        let sink = MemoryAuditSink::new();
        sink.record(AuditEvent {
            sub: Some("agent-1".into()),
            trace: Some("abc".into()),
            outcome: AuditOutcome::Allowed,
            reason: None,
            timestamp: 1,
        });
        sink.record(AuditEvent {
            sub: None,
            trace: Some("abc".into()),
            outcome: AuditOutcome::ReplayBlocked,
            reason: Some("limit exhausted".into()),
            timestamp: 2,
        });

        assert_eq!(
            sink.outcomes(),
            vec![AuditOutcome::Allowed, AuditOutcome::ReplayBlocked]
        );
    }
}
