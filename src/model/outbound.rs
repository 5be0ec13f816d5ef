//! Outbound signal wrappers: per-invocation input, per-group mappable, and
//! per-message mapped result

use super::adaptable::Adaptable;
use super::message::ExternalMessage;
use super::signal::Signal;
use super::target::{PayloadMapping, Target};
use std::sync::Arc;

/// A signal paired with the targets it must be delivered to.
///
/// Responses and errors carry no targets; they go back over the mapper
/// that handled the inbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundSignal {
    pub source: Arc<Signal>,
    pub targets: Vec<Target>,
    /// Pre-enriched fields merged into the adaptable before mapping
    pub extra: Option<serde_json::Value>,
}

impl OutboundSignal {
    pub fn new(source: Signal, targets: Vec<Target>) -> Self {
        Self {
            source: Arc::new(source),
            targets,
            extra: None,
        }
    }

    pub fn with_extra(mut self, extra: serde_json::Value) -> Self {
        self.extra = Some(extra);
        self
    }
}

/// A signal with the subset of its targets that share one payload mapping.
#[derive(Debug, Clone, PartialEq)]
pub struct MappableSignal {
    pub source: Arc<Signal>,
    pub targets: Vec<Target>,
    pub payload_mapping: PayloadMapping,
}

/// One external message produced for a group of targets.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedSignal {
    pub source: Arc<Signal>,
    pub targets: Vec<Target>,
    pub adaptable: Arc<Adaptable>,
    pub external_message: ExternalMessage,
}

impl MappedSignal {
    pub fn new(mappable: &MappableSignal, adaptable: Arc<Adaptable>, message: ExternalMessage) -> Self {
        Self {
            source: mappable.source.clone(),
            targets: mappable.targets.clone(),
            adaptable,
            external_message: message,
        }
    }
}
