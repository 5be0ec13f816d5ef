//! Payload mapping layer
//!
//! Mapper trait, built-in mappers, the engine-name factory and the
//! per-connection mapper registry, plus condition gates and error types.

mod builtin;
pub mod conditions;
mod definition;
mod error;
pub mod placeholders;
mod registry;
mod traits;

pub use builtin::{
    ProtocolMapper, RawPayloadMapper, SplitArrayMapper, BINARY_CONTENT_TYPE, JSON_CONTENT_TYPE,
    PROTOCOL_CONTENT_TYPE, PROTOCOL_ENGINE, RAW_PAYLOAD_ENGINE, SPLIT_ARRAY_ENGINE,
    TEXT_CONTENT_TYPE,
};
pub use conditions::{ConditionContext, ConditionSyntaxError, Conditions};
pub use definition::{MapperConfig, MapperDefinition, PayloadMappingDefinition};
pub use error::{ConfigurationError, MappingError, MappingFailure};
pub use registry::{MapperConstructor, MessageMapperFactory, MessageMapperRegistry, DEFAULT_MAPPER_ID};
pub use traits::MessageMapper;
