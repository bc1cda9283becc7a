//! Cross-session record of datanode failures.

use std::sync::{Arc, OnceLock};
use std::time::Instant;

use dashmap::DashMap;
use dtp_types::Location;

/// Counter store consulted when ranking replica holders.
///
/// Kept to increment and lookup so tests can swap in fixed counts.
pub trait FailureCounts: Send + Sync {
    fn record_failure(&self, location: &Location);

    fn failure_count(&self, location: &Location) -> u64;
}

/// Failures seen for one datanode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureRecord {
    pub count: u64,
    pub last_failure: Instant,
}

/// Thread-safe [`FailureCounts`] keyed by datanode address.
///
/// Entries are never evicted; the key space is the set of datanodes ever
/// contacted, which is small and stable for a cluster.
#[derive(Debug, Default)]
pub struct FailureCache {
    records: DashMap<Location, FailureRecord>,
}

impl FailureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache used by clients that do not bring their own.
    pub fn global() -> Arc<FailureCache> {
        static GLOBAL: OnceLock<Arc<FailureCache>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(FailureCache::new())))
    }

    pub fn record(&self, location: &Location) -> Option<FailureRecord> {
        self.records.get(location).map(|r| *r.value())
    }

    /// Number of datanodes with at least one failure.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FailureCounts for FailureCache {
    fn record_failure(&self, location: &Location) {
        let now = Instant::now();
        self.records
            .entry(location.clone())
            .and_modify(|r| {
                r.count += 1;
                r.last_failure = now;
            })
            .or_insert(FailureRecord {
                count: 1,
                last_failure: now,
            });
    }

    fn failure_count(&self, location: &Location) -> u64 {
        self.records.get(location).map_or(0, |r| r.count)
    }
}
