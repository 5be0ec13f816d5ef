//! Latency measurement around pipeline stages

use crate::model::ConnectionId;
use crate::telemetry::{MappingMetrics, Segment};
use std::sync::Arc;
use std::time::Instant;

/// Times closures and reports the elapsed time to the shared metrics.
///
/// Never changes what the closure returns.
#[derive(Debug, Clone)]
pub struct MappingTimer {
    connection_id: ConnectionId,
    metrics: Option<Arc<MappingMetrics>>,
}

impl MappingTimer {
    pub fn new(connection_id: ConnectionId, metrics: Option<Arc<MappingMetrics>>) -> Self {
        Self {
            connection_id,
            metrics,
        }
    }

    /// Time signal → adaptable.
    pub fn protocol<R>(&self, f: impl FnOnce() -> R) -> R {
        self.time(Segment::Protocol, f)
    }

    /// Time one mapper's transform.
    pub fn payload<R>(&self, mapper_id: &str, f: impl FnOnce() -> R) -> R {
        self.time(Segment::Payload(mapper_id.to_string()), f)
    }

    /// Time a whole invocation.
    pub fn overall<R>(&self, f: impl FnOnce() -> R) -> R {
        self.time(Segment::Overall, f)
    }

    fn time<R>(&self, segment: Segment, f: impl FnOnce() -> R) -> R {
        let Some(metrics) = &self.metrics else {
            return f();
        };
        let start = Instant::now();
        let result = f();
        metrics.record_latency(&self.connection_id, &segment, start.elapsed());
        result
    }
}
