//! Error types of the mapping layer
//!
//! Two tiers: `ConfigurationError` is fatal to construction or to a whole
//! invocation; `MappingError` is one mapper failing on one message and is
//! normalized into a `MappingFailure` carried by an error outcome.

use super::conditions::ConditionSyntaxError;
use crate::model::{keys, Headers};
use thiserror::Error;

/// The connection's mapping configuration cannot be used.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("unknown mapping engine '{engine}' for mapper '{mapper_id}'")]
    UnknownMapperType { mapper_id: String, engine: String },

    #[error("payload mapping references unknown mapper '{0}'")]
    UnknownMapperId(String),

    #[error("mapping engine '{0}' is already registered")]
    DuplicateMapperType(String),

    #[error("mapper '{mapper_id}' option '{option}' is invalid: {reason}")]
    InvalidOption {
        mapper_id: String,
        option: String,
        reason: String,
    },

    #[error("mapper '{mapper_id}' condition '{label}' is invalid: {reason}")]
    InvalidCondition {
        mapper_id: String,
        label: String,
        #[source]
        reason: ConditionSyntaxError,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// A mapper could not transform one message.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("mapper error: {0}")]
    Internal(String),
}

/// Normalized per-mapper failure.
///
/// Carries enough context for a caller to build a protocol error response:
/// which mapper failed, in which direction, the content type and
/// correlation id of the message, and the headers it was mapped with.
#[derive(Debug, Error)]
#[error(
    "the {direction} message with content-type '{content_type}' could not be mapped by mapper '{mapper_id}': {source}"
)]
pub struct MappingFailure {
    pub direction: &'static str,
    pub mapper_id: String,
    pub content_type: String,
    pub correlation_id: Option<String>,
    pub headers: Headers,
    #[source]
    pub source: MappingError,
}

impl MappingFailure {
    pub const OUTBOUND: &'static str = "outbound";

    /// Normalize an outbound mapper error against the headers the message
    /// was mapped with.
    pub fn outbound(mapper_id: impl Into<String>, headers: &Headers, source: MappingError) -> Self {
        Self {
            direction: Self::OUTBOUND,
            mapper_id: mapper_id.into(),
            content_type: headers.get(keys::CONTENT_TYPE).unwrap_or_default().to_string(),
            correlation_id: headers.correlation_id().map(str::to_string),
            headers: headers.clone(),
            source,
        }
    }
}
