//! Built-in mappers registered with every mapper factory

use super::conditions::Conditions;
use super::definition::MapperConfig;
use super::error::{ConfigurationError, MappingError};
use super::traits::MessageMapper;
use crate::model::{Adaptable, ExternalMessage, Headers, Payload};
use serde_json::{json, Value};

pub const PROTOCOL_ENGINE: &str = "protocol";
pub const RAW_PAYLOAD_ENGINE: &str = "raw-payload";
pub const SPLIT_ARRAY_ENGINE: &str = "split-array";

pub const PROTOCOL_CONTENT_TYPE: &str = "application/vnd.eclipse.ditto+json";
pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const TEXT_CONTENT_TYPE: &str = "text/plain";
pub const BINARY_CONTENT_TYPE: &str = "application/octet-stream";

const CONTENT_TYPE_OPTION: &str = "content-type";
const MAX_MESSAGES_OPTION: &str = "max-messages";

/// Id and conditions every built-in carries.
#[derive(Debug, Clone)]
struct MapperIdentity {
    id: String,
    incoming: Conditions,
    outgoing: Conditions,
}

impl MapperIdentity {
    fn from_config(config: &MapperConfig<'_>) -> Result<Self, ConfigurationError> {
        Ok(Self {
            id: config.id.to_string(),
            incoming: config.incoming_conditions()?,
            outgoing: config.outgoing_conditions()?,
        })
    }

    fn unconditional(id: &str) -> Self {
        Self {
            id: id.to_string(),
            incoming: Conditions::empty(),
            outgoing: Conditions::empty(),
        }
    }
}

/// Outgoing headers: the adaptable's headers without internal-only entries.
fn external_headers(adaptable: &Adaptable) -> Headers {
    let mut headers = adaptable.headers.clone();
    headers.remove(crate::model::keys::INBOUND_PAYLOAD_MAPPER);
    headers
}

// ---------------------------------------------------------------------------
// protocol
// ---------------------------------------------------------------------------

/// The default mapper: serializes the whole adaptable as a JSON protocol
/// envelope. Always produces exactly one message.
#[derive(Debug, Clone)]
pub struct ProtocolMapper {
    identity: MapperIdentity,
}

impl ProtocolMapper {
    /// An unconditional instance under `id`.
    pub fn new(id: &str) -> Self {
        Self {
            identity: MapperIdentity::unconditional(id),
        }
    }

    pub fn from_config(config: &MapperConfig<'_>) -> Result<Self, ConfigurationError> {
        Ok(Self {
            identity: MapperIdentity::from_config(config)?,
        })
    }
}

impl MessageMapper for ProtocolMapper {
    fn id(&self) -> &str {
        &self.identity.id
    }

    fn incoming_conditions(&self) -> &Conditions {
        &self.identity.incoming
    }

    fn outgoing_conditions(&self) -> &Conditions {
        &self.identity.outgoing
    }

    fn map(&self, adaptable: &Adaptable) -> Result<Vec<ExternalMessage>, MappingError> {
        let mut envelope = json!({
            "topic": adaptable.topic_path.path(),
            "headers": adaptable.headers,
            "path": adaptable.path,
        });
        if let Some(value) = &adaptable.value {
            envelope["value"] = value.clone();
        }
        if let Some(extra) = &adaptable.extra {
            envelope["extra"] = extra.clone();
        }

        let body = serde_json::to_string(&envelope)?;
        Ok(vec![ExternalMessage::text(external_headers(adaptable), body)
            .with_content_type(PROTOCOL_CONTENT_TYPE)])
    }
}

// ---------------------------------------------------------------------------
// raw-payload
// ---------------------------------------------------------------------------

/// Emits only the adaptable's value.
///
/// Option `content-type` fixes the content type; otherwise strings go out as
/// `text/plain` and everything else as JSON. With
/// `application/octet-stream` the value must be a string, sent as bytes.
/// An adaptable without a value produces no message.
#[derive(Debug, Clone)]
pub struct RawPayloadMapper {
    identity: MapperIdentity,
    content_type: Option<String>,
}

impl RawPayloadMapper {
    pub fn from_config(config: &MapperConfig<'_>) -> Result<Self, ConfigurationError> {
        let content_type = config.option_str(CONTENT_TYPE_OPTION)?;
        if let Some(ct) = content_type {
            if ct.trim().is_empty() {
                return Err(config.invalid_option(CONTENT_TYPE_OPTION, "must not be blank"));
            }
        }
        Ok(Self {
            identity: MapperIdentity::from_config(config)?,
            content_type: content_type.map(str::to_string),
        })
    }
}

impl MessageMapper for RawPayloadMapper {
    fn id(&self) -> &str {
        &self.identity.id
    }

    fn incoming_conditions(&self) -> &Conditions {
        &self.identity.incoming
    }

    fn outgoing_conditions(&self) -> &Conditions {
        &self.identity.outgoing
    }

    fn map(&self, adaptable: &Adaptable) -> Result<Vec<ExternalMessage>, MappingError> {
        let Some(value) = &adaptable.value else {
            return Ok(Vec::new());
        };
        let headers = external_headers(adaptable);

        let message = match (self.content_type.as_deref(), value) {
            (Some(BINARY_CONTENT_TYPE), Value::String(s)) => {
                ExternalMessage::bytes(headers, s.as_bytes().to_vec())
                    .with_content_type(BINARY_CONTENT_TYPE)
            }
            (Some(BINARY_CONTENT_TYPE), other) => {
                return Err(MappingError::InvalidPayload(format!(
                    "binary content requires a string value, got {}",
                    json_kind(other)
                )))
            }
            (content_type, Value::String(s)) => ExternalMessage::text(headers, s.clone())
                .with_content_type(content_type.unwrap_or(TEXT_CONTENT_TYPE)),
            (content_type, other) => ExternalMessage::text(headers, serde_json::to_string(other)?)
                .with_content_type(content_type.unwrap_or(JSON_CONTENT_TYPE)),
        };
        Ok(vec![message])
    }
}

// ---------------------------------------------------------------------------
// split-array
// ---------------------------------------------------------------------------

/// Emits one JSON message per element of an array value.
///
/// Option `max-messages` caps the element count; a larger array fails the
/// mapping. A non-array value fails; an empty array produces nothing.
#[derive(Debug, Clone)]
pub struct SplitArrayMapper {
    identity: MapperIdentity,
    max_messages: Option<usize>,
}

impl SplitArrayMapper {
    pub fn from_config(config: &MapperConfig<'_>) -> Result<Self, ConfigurationError> {
        Ok(Self {
            identity: MapperIdentity::from_config(config)?,
            max_messages: config.option_positive(MAX_MESSAGES_OPTION)?,
        })
    }
}

impl MessageMapper for SplitArrayMapper {
    fn id(&self) -> &str {
        &self.identity.id
    }

    fn incoming_conditions(&self) -> &Conditions {
        &self.identity.incoming
    }

    fn outgoing_conditions(&self) -> &Conditions {
        &self.identity.outgoing
    }

    fn map(&self, adaptable: &Adaptable) -> Result<Vec<ExternalMessage>, MappingError> {
        let items = match &adaptable.value {
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(MappingError::InvalidPayload(format!(
                    "expected an array value, got {}",
                    json_kind(other)
                )))
            }
            None => return Err(MappingError::InvalidPayload("missing value".to_string())),
        };

        if let Some(max) = self.max_messages {
            if items.len() > max {
                return Err(MappingError::InvalidPayload(format!(
                    "array has {} elements, more than max-messages {}",
                    items.len(),
                    max
                )));
            }
        }

        let headers = external_headers(adaptable);
        items
            .iter()
            .map(|item| -> Result<ExternalMessage, MappingError> {
                Ok(ExternalMessage::new(headers.clone())
                    .with_payload(Payload::Text(serde_json::to_string(item)?))
                    .with_content_type(JSON_CONTENT_TYPE))
            })
            .collect()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
