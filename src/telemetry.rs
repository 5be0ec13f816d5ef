//! Mapping telemetry: latency timers and outcome counters
//!
//! Shared by every processor of a gateway. All recording goes through
//! `DashMap` entries holding atomics, so concurrent `process` calls never
//! contend on a lock for longer than a shard lookup.

use crate::model::ConnectionId;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// A measured stretch of the outbound pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Signal → adaptable
    Protocol,
    /// One mapper's transform
    Payload(String),
    /// A whole `process` call
    Overall,
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Segment::Protocol => write!(f, "protocol"),
            Segment::Payload(mapper_id) => write!(f, "payload:{}", mapper_id),
            Segment::Overall => write!(f, "overall"),
        }
    }
}

/// Which outcome variant was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Mapped,
    Dropped,
    Failed,
}

#[derive(Debug, Default)]
struct LatencyStats {
    count: AtomicU64,
    total_ns: AtomicU64,
    max_ns: AtomicU64,
}

impl LatencyStats {
    fn record(&self, elapsed_ns: u64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_ns.fetch_add(elapsed_ns, Ordering::Relaxed);
        self.max_ns.fetch_max(elapsed_ns, Ordering::Relaxed);
    }
}

#[derive(Debug, Default)]
struct OutcomeCounters {
    mapped: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
}

/// Concurrent collector for mapping latencies and outcome counts.
#[derive(Debug, Default)]
pub struct MappingMetrics {
    latencies: DashMap<(ConnectionId, String), LatencyStats>,
    outcomes: DashMap<ConnectionId, OutcomeCounters>,
}

impl MappingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_latency(&self, connection_id: &ConnectionId, segment: &Segment, elapsed: Duration) {
        let elapsed_ns = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.latencies
            .entry((connection_id.clone(), segment.to_string()))
            .or_default()
            .record(elapsed_ns);
    }

    pub fn record_outcome(&self, connection_id: &ConnectionId, kind: OutcomeKind) {
        let counters = self.outcomes.entry(connection_id.clone()).or_default();
        let counter = match kind {
            OutcomeKind::Mapped => &counters.mapped,
            OutcomeKind::Dropped => &counters.dropped,
            OutcomeKind::Failed => &counters.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of recorded measurements for one segment.
    pub fn latency_count(&self, connection_id: &ConnectionId, segment: &Segment) -> u64 {
        self.latencies
            .get(&(connection_id.clone(), segment.to_string()))
            .map(|s| s.count.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Outcome counts of one connection.
    pub fn outcome_counts(&self, connection_id: &ConnectionId) -> OutcomeSnapshot {
        self.outcomes
            .get(connection_id)
            .map(|c| OutcomeSnapshot::of(connection_id, &c))
            .unwrap_or_else(|| OutcomeSnapshot {
                connection_id: connection_id.clone(),
                mapped: 0,
                dropped: 0,
                failed: 0,
            })
    }

    /// Point-in-time copy of everything recorded, sorted by connection then
    /// segment.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let mut latencies: Vec<LatencySnapshot> = self
            .latencies
            .iter()
            .map(|entry| {
                let (connection_id, segment) = entry.key();
                let stats = entry.value();
                let count = stats.count.load(Ordering::Relaxed);
                let total_ns = stats.total_ns.load(Ordering::Relaxed);
                LatencySnapshot {
                    connection_id: connection_id.clone(),
                    segment: segment.clone(),
                    count,
                    total_ns,
                    max_ns: stats.max_ns.load(Ordering::Relaxed),
                    mean_ns: if count == 0 { 0 } else { total_ns / count },
                }
            })
            .collect();
        latencies.sort_by(|a, b| {
            (a.connection_id.as_str(), a.segment.as_str()).cmp(&(b.connection_id.as_str(), b.segment.as_str()))
        });

        let mut outcomes: Vec<OutcomeSnapshot> = self
            .outcomes
            .iter()
            .map(|entry| OutcomeSnapshot::of(entry.key(), entry.value()))
            .collect();
        outcomes.sort_by(|a, b| a.connection_id.as_str().cmp(b.connection_id.as_str()));

        MetricsSnapshot {
            taken_at: Utc::now(),
            latencies,
            outcomes,
        }
    }

    /// Drop everything recorded.
    pub fn reset(&self) {
        self.latencies.clear();
        self.outcomes.clear();
    }
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencySnapshot {
    pub connection_id: ConnectionId,
    pub segment: String,
    pub count: u64,
    pub total_ns: u64,
    pub max_ns: u64,
    pub mean_ns: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutcomeSnapshot {
    pub connection_id: ConnectionId,
    pub mapped: u64,
    pub dropped: u64,
    pub failed: u64,
}

impl OutcomeSnapshot {
    fn of(connection_id: &ConnectionId, counters: &OutcomeCounters) -> Self {
        Self {
            connection_id: connection_id.clone(),
            mapped: counters.mapped.load(Ordering::Relaxed),
            dropped: counters.dropped.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub taken_at: DateTime<Utc>,
    pub latencies: Vec<LatencySnapshot>,
    pub outcomes: Vec<OutcomeSnapshot>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn segment_names() {
        assert_eq!(Segment::Protocol.to_string(), "protocol");
        assert_eq!(Segment::Payload("m1".into()).to_string(), "payload:m1");
        assert_eq!(Segment::Overall.to_string(), "overall");
    }

    #[test]
    fn latency_stats_accumulate() {
        let metrics = MappingMetrics::new();
        let conn = ConnectionId::from("c1");
        metrics.record_latency(&conn, &Segment::Overall, Duration::from_nanos(100));
        metrics.record_latency(&conn, &Segment::Overall, Duration::from_nanos(300));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.latencies.len(), 1);
        let overall = &snapshot.latencies[0];
        assert_eq!(overall.segment, "overall");
        assert_eq!(overall.count, 2);
        assert_eq!(overall.total_ns, 400);
        assert_eq!(overall.max_ns, 300);
        assert_eq!(overall.mean_ns, 200);
    }

    #[test]
    fn outcomes_are_counted_per_connection() {
        let metrics = MappingMetrics::new();
        let a = ConnectionId::from("a");
        let b = ConnectionId::from("b");
        metrics.record_outcome(&a, OutcomeKind::Mapped);
        metrics.record_outcome(&a, OutcomeKind::Mapped);
        metrics.record_outcome(&a, OutcomeKind::Failed);
        metrics.record_outcome(&b, OutcomeKind::Dropped);

        let counts = metrics.outcome_counts(&a);
        assert_eq!((counts.mapped, counts.dropped, counts.failed), (2, 0, 1));
        let snapshot = metrics.snapshot();
        let ids: Vec<_> = snapshot.outcomes.iter().map(|o| o.connection_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);

        assert_eq!(metrics.outcome_counts(&ConnectionId::from("none")).mapped, 0);
    }

    #[test]
    fn snapshot_serializes_with_timestamp() {
        let metrics = MappingMetrics::new();
        let conn = ConnectionId::from("c1");
        metrics.record_latency(&conn, &Segment::Protocol, Duration::from_micros(5));
        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert!(json["taken_at"].is_string());
        assert_eq!(json["latencies"][0]["connection_id"], "c1");

        metrics.reset();
        assert!(metrics.snapshot().latencies.is_empty());
    }

    #[test]
    fn concurrent_recording_is_lossless() {
        let metrics = Arc::new(MappingMetrics::new());
        let conn = ConnectionId::from("c1");
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let metrics = metrics.clone();
                let conn = conn.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        metrics.record_outcome(&conn, OutcomeKind::Mapped);
                        metrics.record_latency(&conn, &Segment::Overall, Duration::from_nanos(1));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(metrics.outcome_counts(&conn).mapped, 8000);
        assert_eq!(metrics.latency_count(&conn, &Segment::Overall), 8000);
    }
}
