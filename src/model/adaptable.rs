//! Adaptable: protocol-neutral representation of a signal

use super::headers::Headers;
use serde::{Serialize, Serializer};

/// Placeholder used for topic segments the signal cannot supply.
pub const UNKNOWN_SEGMENT: &str = "_";

/// Topic of an adapted signal:
/// `{namespace}/{entity-name}/{group}/{channel}/{criterion}[/{action}]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicPath {
    pub namespace: String,
    pub entity_name: String,
    pub group: String,
    pub channel: String,
    pub criterion: String,
    pub action: Option<String>,
}

impl TopicPath {
    /// The full path string.
    pub fn path(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for TopicPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}/{}",
            self.namespace, self.entity_name, self.group, self.channel, self.criterion
        )?;
        if let Some(action) = &self.action {
            write!(f, "/{}", action)?;
        }
        Ok(())
    }
}

impl Serialize for TopicPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Protocol-neutral form of a signal: topic, headers, path, optional value
/// and optional extra fields merged in before mapping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Adaptable {
    pub topic_path: TopicPath,
    pub headers: Headers,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

impl Adaptable {
    pub fn correlation_id(&self) -> Option<&str> {
        self.headers.correlation_id()
    }
}
