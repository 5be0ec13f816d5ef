//! Delivery targets and their payload mappings

use serde::{Deserialize, Serialize};

/// Ordered list of mapper ids applied to a target's messages.
///
/// Order is significant: two mappings are equal only if they name the same
/// mappers in the same order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PayloadMapping(Vec<String>);

impl PayloadMapping {
    pub fn new<I, S>(mapper_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(mapper_ids.into_iter().map(Into::into).collect())
    }

    /// The mapping with no mappers; resolved to the registry's default mapper.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn mapper_ids(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A delivery destination with its own mapper chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Target {
    /// Transport-specific address
    pub address: String,
    #[serde(default)]
    pub payload_mapping: PayloadMapping,
    /// Label this target satisfies once its message is published; may
    /// contain a `{{ connection:id }}` placeholder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_acknowledgement_label: Option<String>,
}

impl Target {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            payload_mapping: PayloadMapping::empty(),
            issued_acknowledgement_label: None,
        }
    }

    pub fn with_payload_mapping(mut self, mapping: PayloadMapping) -> Self {
        self.payload_mapping = mapping;
        self
    }

    pub fn with_issued_acknowledgement_label(mut self, label: impl Into<String>) -> Self {
        self.issued_acknowledgement_label = Some(label.into());
        self
    }
}
