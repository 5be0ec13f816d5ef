//! Protocol adapter: signal → protocol-neutral adaptable
//!
//! The mapping pipeline calls `to_adaptable` exactly once per outbound
//! signal. Implementations must be deterministic and free of side effects.

use crate::classify;
use crate::model::{Adaptable, Signal, TopicPath, UNKNOWN_SEGMENT};

pub trait ProtocolAdapter: Send + Sync {
    /// Convert a signal to its protocol-neutral representation.
    fn to_adaptable(&self, signal: &Signal) -> Adaptable;

    /// Merge pre-enriched extra fields into an adaptable.
    ///
    /// Object fields are merged over any existing extra object; any other
    /// value replaces it.
    fn set_extra(&self, mut adaptable: Adaptable, extra: &serde_json::Value) -> Adaptable {
        adaptable.extra = match (adaptable.extra.take(), extra) {
            (Some(serde_json::Value::Object(mut existing)), serde_json::Value::Object(fields)) => {
                for (k, v) in fields {
                    existing.insert(k.clone(), v.clone());
                }
                Some(serde_json::Value::Object(existing))
            }
            (_, value) => Some(value.clone()),
        };
        adaptable
    }
}

/// Derives the topic from the signal's type tag and entity id.
///
/// A type tag `group.criterion:action` (e.g. `things.events:thingCreated`)
/// yields `{namespace}/{name}/group/{channel}/criterion/action`. Message
/// signals map to the `things` group with criterion `messages` on the live
/// channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultProtocolAdapter;

impl DefaultProtocolAdapter {
    pub fn new() -> Self {
        Self
    }

    fn topic_path(signal: &Signal) -> TopicPath {
        let (prefix, action) = match signal.kind.split_once(':') {
            Some((prefix, action)) if !action.is_empty() => (prefix, Some(action.to_string())),
            Some((prefix, _)) => (prefix, None),
            None => (signal.kind.as_str(), None),
        };
        let (group, criterion) = prefix.split_once('.').unwrap_or((prefix, UNKNOWN_SEGMENT));

        let (group, criterion) = if group == "messages" {
            ("things", "messages")
        } else {
            (group, criterion)
        };

        let live = classify::is_channel_live(signal)
            || classify::is_message_command(signal)
            || classify::is_message_command_response(signal);

        let (namespace, entity_name) = match classify::entity_id(signal) {
            Some(id) if !id.namespace().is_empty() => (id.namespace(), id.name()),
            Some(id) => (UNKNOWN_SEGMENT, id.name()),
            None => (UNKNOWN_SEGMENT, UNKNOWN_SEGMENT),
        };

        TopicPath {
            namespace: namespace.to_string(),
            entity_name: entity_name.to_string(),
            group: non_empty(group),
            channel: if live { "live" } else { "twin" }.to_string(),
            criterion: non_empty(criterion),
            action,
        }
    }
}

fn non_empty(segment: &str) -> String {
    if segment.is_empty() {
        UNKNOWN_SEGMENT.to_string()
    } else {
        segment.to_string()
    }
}

impl ProtocolAdapter for DefaultProtocolAdapter {
    fn to_adaptable(&self, signal: &Signal) -> Adaptable {
        Adaptable {
            topic_path: Self::topic_path(signal),
            headers: signal.headers.clone(),
            path: signal.path.clone(),
            value: signal.value.clone(),
            extra: None,
        }
    }
}
