//! Per-trace usage accounting
//!
//! The usage store is the replay backstop: each token's `trace` maps to a
//! counter that may be consumed at most `limit` times before `exp`. The
//! trait is async so that remote backends (a scripted Redis transaction, a
//! database row) can implement it; the in-memory store is the default for
//! single-instance deployments.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

/// Why a consumption was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageErrorKind {
    /// The trace's expiry has passed
    TokenExpired,
    /// All `limit` units have been consumed
    LimitExhausted,
}

/// Error returned by [`UsageStore::consume`]
#[derive(Debug, Clone, Error)]
#[error("usage refused: {kind:?}")]
pub struct UsageStoreError {
    /// Machine-readable refusal reason
    pub kind: UsageErrorKind,
}

impl UsageStoreError {
    /// Refusal because the trace is past its expiry
    pub fn expired() -> Self {
        Self {
            kind: UsageErrorKind::TokenExpired,
        }
    }

    /// Refusal because the limit is exhausted
    pub fn exhausted() -> Self {
        Self {
            kind: UsageErrorKind::LimitExhausted,
        }
    }
}

/// Counter state held per trace
///
/// `limit` and `exp` are fixed at first observation; later consume calls
/// never mutate them.
#[derive(Debug, Clone)]
struct UsageRecord {
    used: u32,
    limit: u32,
    exp: i64,
}

/// Atomic per-trace counter with TTL
///
/// For a given trace, `consume` calls are linearizable: with `limit = 1`,
/// two concurrent calls yield exactly one success.
#[async_trait]
pub trait UsageStore: Send + Sync + Debug {
    /// Consume one unit of the trace's quota
    ///
    /// Semantics:
    /// 1. no record, `now > exp`: refuse `TokenExpired` without creating one
    /// 2. no record, `now <= exp`: create `{used: 1, limit, exp}` and succeed
    /// 3. record exists, `now > record.exp`: evict and refuse `TokenExpired`
    /// 4. record exists, `used >= limit`: refuse `LimitExhausted`
    /// 5. otherwise: increment `used` and succeed
    async fn consume(
        &self,
        trace: &str,
        limit: u32,
        exp: i64,
        now: i64,
    ) -> Result<(), UsageStoreError>;
}

/// Default capacity of the in-memory store
pub const DEFAULT_USAGE_CAPACITY: usize = 10_000;

/// In-memory usage store
///
/// A single mutex around the record map is the critical section; nothing
/// inside it performs I/O or awaits, so steps 3-5 of the contract are one
/// atomic unit per call. Expired entries are swept opportunistically when
/// the map reaches capacity; if a sweep frees nothing, the record with the
/// earliest expiry is dropped. A trimmed trace that returns is treated as a
/// new record, which is safe: the expiry gate still refuses stale reuse, and
/// a live collision requires forging a fresh token for the same trace.
#[derive(Debug)]
pub struct MemoryUsageStore {
    records: Mutex<HashMap<String, UsageRecord>>,
    capacity: usize,
}

impl MemoryUsageStore {
    /// Create a store with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_USAGE_CAPACITY)
    }

    /// Create a store bounded to `capacity` live records
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Number of records currently held
    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// Whether the store holds no records
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn make_room(records: &mut HashMap<String, UsageRecord>, now: i64) {
        let before = records.len();
        records.retain(|_, record| now <= record.exp);
        if records.len() < before {
            debug!(evicted = before - records.len(), "swept expired usage records");
            return;
        }

        // Nothing expired; drop the record closest to expiry
        if let Some(trace) = records
            .iter()
            .min_by_key(|(_, record)| record.exp)
            .map(|(trace, _)| trace.clone())
        {
            records.remove(&trace);
            debug!(%trace, "trimmed usage record at capacity");
        }
    }
}

impl Default for MemoryUsageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UsageStore for MemoryUsageStore {
    async fn consume(
        &self,
        trace: &str,
        limit: u32,
        exp: i64,
        now: i64,
    ) -> Result<(), UsageStoreError> {
        let mut records = self.records.lock().unwrap();

        if let Some(record) = records.get_mut(trace) {
            if now > record.exp {
                records.remove(trace);
                return Err(UsageStoreError::expired());
            }
            if record.used >= record.limit {
                return Err(UsageStoreError::exhausted());
            }
            record.used += 1;
            return Ok(());
        }

        if now > exp {
            return Err(UsageStoreError::expired());
        }

        if records.len() >= self.capacity {
            Self::make_room(&mut records, now);
        }

        records.insert(
            trace.to_string(),
            UsageRecord {
                used: 1,
                limit,
                exp,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_first_consume_creates_record() {
        let store = MemoryUsageStore::new();

        store.consume("t1", 1, 100, 50).await.unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_expired_trace_not_created() {
        let store = MemoryUsageStore::new();

        let err = store.consume("t1", 1, 100, 101).await.unwrap_err();
        assert_eq!(err.kind, UsageErrorKind::TokenExpired);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_limit_exhaustion() {
        let store = MemoryUsageStore::new();

        store.consume("t1", 2, 100, 50).await.unwrap();
        store.consume("t1", 2, 100, 51).await.unwrap();

        let err = store.consume("t1", 2, 100, 52).await.unwrap_err();
        assert_eq!(err.kind, UsageErrorKind::LimitExhausted);
    }

    #[tokio::test]
    async fn test_existing_record_evicted_after_expiry() {
        let store = MemoryUsageStore::new();

        store.consume("t1", 5, 100, 50).await.unwrap();

        let err = store.consume("t1", 5, 100, 101).await.unwrap_err();
        assert_eq!(err.kind, UsageErrorKind::TokenExpired);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_limit_and_exp_fixed_at_first_observation() {
        let store = MemoryUsageStore::new();

        store.consume("t1", 1, 100, 50).await.unwrap();

        // A second call claiming a looser limit must not widen the record
        let err = store.consume("t1", 10, 999, 51).await.unwrap_err();
        assert_eq!(err.kind, UsageErrorKind::LimitExhausted);
    }

    #[tokio::test]
    async fn test_concurrent_consume_single_winner() {
        let store = Arc::new(MemoryUsageStore::new());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.consume("race", 1, 10_000, 1).await.is_ok()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1, "exactly one concurrent consume may succeed");
    }

    #[tokio::test]
    async fn test_capacity_sweep_prefers_expired() {
        let store = MemoryUsageStore::with_capacity(2);

        store.consume("old", 1, 10, 5).await.unwrap();
        store.consume("live", 5, 100, 5).await.unwrap();

        // At capacity and "old" has expired by now=50; it is swept, "live"
        // keeps its counter
        store.consume("fresh", 1, 100, 50).await.unwrap();

        let err = store.consume("live", 5, 100, 51).await;
        assert!(err.is_ok(), "live record must survive the sweep");
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_capacity_trim_drops_earliest_expiry() {
        let store = MemoryUsageStore::with_capacity(2);

        store.consume("soon", 1, 60, 5).await.unwrap();
        store.consume("late", 1, 100, 5).await.unwrap();

        // Nothing expired; the record expiring first is trimmed
        store.consume("fresh", 1, 100, 6).await.unwrap();
        assert_eq!(store.len(), 2);

        // The trimmed trace returns and is treated as a new record; expiry
        // gating still applies to it
        store.consume("soon", 1, 60, 7).await.unwrap();
        let err = store.consume("soon", 1, 60, 61).await.unwrap_err();
        assert_eq!(err.kind, UsageErrorKind::TokenExpired);
    }
}
