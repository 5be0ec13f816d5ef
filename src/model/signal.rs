//! Signal: an internal domain event or command crossing the gateway

use super::headers::Headers;
use serde::{Deserialize, Serialize};

/// Identifier of the entity a signal concerns, in `namespace:name` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Part before the first `:`, empty if there is none.
    pub fn namespace(&self) -> &str {
        self.0.split_once(':').map(|(ns, _)| ns).unwrap_or("")
    }

    /// Part after the first `:`, or the whole id.
    pub fn name(&self) -> &str {
        self.0.split_once(':').map(|(_, name)| name).unwrap_or(&self.0)
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn root_path() -> String {
    "/".to_string()
}

/// An immutable domain event, command or response.
///
/// `kind` is the type tag, e.g. `things.events:attributeModified`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default, rename = "entityId", skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<EntityId>,
    /// Resource path inside the entity the signal addresses
    #[serde(default = "root_path")]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

impl Signal {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            headers: Headers::new(),
            entity_id: None,
            path: root_path(),
            value: None,
        }
    }

    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_header(mut self, key: &str, value: impl Into<String>) -> Self {
        self.headers.insert(key, value);
        self
    }

    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(EntityId::new(id));
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_value(mut self, value: serde_json::Value) -> Self {
        self.value = Some(value);
        self
    }
}
