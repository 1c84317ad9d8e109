//! Relay counters
//!
//! Plain atomic counters shared across the relay loops and the
//! supervisor. Exposition (scrape endpoints, push gateways) is a
//! separate collaborator; these are the raw numbers it would read.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by one relay deployment
#[derive(Debug, Default)]
pub struct RelayCounters {
    /// Packets successfully relayed to at least one destination
    pub packets_relayed: AtomicU64,
    /// Inbound datagrams dropped because the header failed to parse
    pub parse_errors: AtomicU64,
    /// Writes to a destination track that failed (full or closed queue)
    pub track_write_failures: AtomicU64,
    /// Ingest packets dropped by the backpressure policy
    pub ingest_drops: AtomicU64,
    /// Relay launches that failed at startup
    pub failed_launches: AtomicU64,
}

impl RelayCounters {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_relayed(&self) {
        self.packets_relayed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_parse_error(&self) {
        self.parse_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_track_write_failure(&self) {
        self.track_write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ingest_drop(&self) {
        self.ingest_drops.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed_launch(&self) {
        self.failed_launches.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            packets_relayed: self.packets_relayed.load(Ordering::Relaxed),
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
            track_write_failures: self.track_write_failures.load(Ordering::Relaxed),
            ingest_drops: self.ingest_drops.load(Ordering::Relaxed),
            failed_launches: self.failed_launches.load(Ordering::Relaxed),
        }
    }
}

/// Non-atomic copy of [`RelayCounters`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountersSnapshot {
    pub packets_relayed: u64,
    pub parse_errors: u64,
    pub track_write_failures: u64,
    pub ingest_drops: u64,
    pub failed_launches: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero() {
        let counters = RelayCounters::new();
        assert_eq!(counters.snapshot(), CountersSnapshot::default());
    }

    #[test]
    fn test_record_and_snapshot() {
        let counters = RelayCounters::new();

        counters.record_relayed();
        counters.record_relayed();
        counters.record_parse_error();
        counters.record_track_write_failure();
        counters.record_ingest_drop();
        counters.record_failed_launch();

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.packets_relayed, 2);
        assert_eq!(snapshot.parse_errors, 1);
        assert_eq!(snapshot.track_write_failures, 1);
        assert_eq!(snapshot.ingest_drops, 1);
        assert_eq!(snapshot.failed_launches, 1);
    }
}
