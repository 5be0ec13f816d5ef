//! Acknowledgement labels and requests

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

const MIN_LABEL_LEN: usize = 3;
const MAX_LABEL_LEN: usize = 165;

/// A label did not match `[a-zA-Z0-9-_:]{3,165}`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid acknowledgement label '{0}'")]
pub struct InvalidLabel(pub String);

/// Name of an acknowledgement obligation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct AcknowledgementLabel(String);

impl AcknowledgementLabel {
    pub fn parse(label: impl Into<String>) -> Result<Self, InvalidLabel> {
        let label = label.into();
        let valid_chars = label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == ':');
        if valid_chars && (MIN_LABEL_LEN..=MAX_LABEL_LEN).contains(&label.len()) {
            Ok(Self(label))
        } else {
            Err(InvalidLabel(label))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AcknowledgementLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for AcknowledgementLabel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(raw).map_err(serde::de::Error::custom)
    }
}

/// A request that some party confirms delivery under `label`.
///
/// `filter` is the deliverability rule restricting which deliveries may
/// satisfy the request; `None` means any.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AcknowledgementRequest {
    pub label: AcknowledgementLabel,
    pub filter: Option<String>,
}

impl AcknowledgementRequest {
    pub fn new(label: AcknowledgementLabel) -> Self {
        Self { label, filter: None }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}

/// Wire form: a bare label string, or an object when a filter is present.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RequestRepr {
    Label(AcknowledgementLabel),
    Filtered {
        label: AcknowledgementLabel,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filter: Option<String>,
    },
}

impl Serialize for AcknowledgementRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let repr = match &self.filter {
            None => RequestRepr::Label(self.label.clone()),
            Some(filter) => RequestRepr::Filtered {
                label: self.label.clone(),
                filter: Some(filter.clone()),
            },
        };
        repr.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AcknowledgementRequest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RequestRepr::deserialize(deserializer)? {
            RequestRepr::Label(label) => Self::new(label),
            RequestRepr::Filtered { label, filter } => Self { label, filter },
        })
    }
}
