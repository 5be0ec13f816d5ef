//! Connectivity Mapping: outbound signal-to-message pipeline
//!
//! Turns internal signals into external wire messages for a connection's
//! delivery targets. Each target names an ordered chain of payload mappers;
//! one signal can therefore become zero, one or many messages, each of which
//! is mapped, dropped or failed independently.
//!
//! # Core Concepts
//!
//! - **Signal**: an internal event, command or response with headers
//! - **Target**: a delivery destination with its own payload mapping
//! - **Adaptable**: protocol-neutral form of a signal, built once per call
//! - **MessageMapper**: a condition-gated transform from adaptable to messages
//! - **MappingOutcome**: what one mapper did: `Mapped`, `Dropped` or `Error`
//!
//! # Example
//!
//! ```
//! use connectivity_mapping::{
//!     ConnectionId, ConnectionType, DefaultProtocolAdapter, MessageMapperFactory,
//!     OutboundMappingProcessor, OutboundSignal, PayloadMappingDefinition, Signal, Target,
//! };
//! use std::sync::Arc;
//!
//! let processor = OutboundMappingProcessor::new(
//!     ConnectionId::from("my-connection"),
//!     ConnectionType::Mqtt,
//!     &PayloadMappingDefinition::new(),
//!     &MessageMapperFactory::with_builtins(),
//!     Arc::new(DefaultProtocolAdapter::new()),
//! )
//! .unwrap();
//!
//! let signal = Signal::new("things.events:modified").with_entity_id("org.example:lamp");
//! let outcomes = processor
//!     .process(&OutboundSignal::new(signal, vec![Target::new("topic/lamps")]))
//!     .unwrap();
//! assert!(outcomes[0].is_mapped());
//! ```

pub mod classify;
pub mod config;
pub mod mapping;
pub mod model;
pub mod outbound;
pub mod protocol;
pub mod purge;
pub mod telemetry;

pub use config::{ConnectionSettings, ConnectivityConfig, MappingConfig};
pub use mapping::{
    ConfigurationError, MapperDefinition, MappingError, MappingFailure, MessageMapper,
    MessageMapperFactory, MessageMapperRegistry, PayloadMappingDefinition,
};
pub use model::{
    Adaptable, ConnectionId, ConnectionType, ExternalMessage, Headers, MappableSignal,
    MappedSignal, OutboundSignal, PayloadMapping, Signal, Target, TopicPath,
};
pub use outbound::{MappingOutcome, OutboundMappingProcessor};
pub use protocol::{DefaultProtocolAdapter, ProtocolAdapter};
pub use purge::{NamespaceOps, PurgeError};
pub use telemetry::{MappingMetrics, MetricsSnapshot};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
