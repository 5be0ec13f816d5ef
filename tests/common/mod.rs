//! Common test utilities for the outbound mapping integration tests
//!
//! A recording mapper engine that counts invocations, plus fixtures for
//! signals, targets and processors.

#![allow(dead_code)]

use connectivity_mapping::mapping::{Conditions, MapperConfig};
use connectivity_mapping::{
    Adaptable, ConfigurationError, ConnectionId, ConnectionType, DefaultProtocolAdapter,
    ExternalMessage, MappingError, MessageMapper, MessageMapperFactory, OutboundMappingProcessor,
    PayloadMapping, PayloadMappingDefinition, Signal, Target,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const RECORDING_ENGINE: &str = "recording";

/// Emits one text message `"<id>:<topic>"` per call and counts calls.
pub struct RecordingMapper {
    id: String,
    outgoing: Conditions,
    incoming: Conditions,
    calls: Arc<AtomicUsize>,
}

impl MessageMapper for RecordingMapper {
    fn id(&self) -> &str {
        &self.id
    }

    fn incoming_conditions(&self) -> &Conditions {
        &self.incoming
    }

    fn outgoing_conditions(&self) -> &Conditions {
        &self.outgoing
    }

    fn map(&self, adaptable: &Adaptable) -> Result<Vec<ExternalMessage>, MappingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![ExternalMessage::text(
            adaptable.headers.clone(),
            format!("{}:{}", self.id, adaptable.topic_path),
        )])
    }
}

/// A factory with the built-ins and the recording engine; every recording
/// mapper it builds shares `calls`.
pub fn recording_factory(calls: Arc<AtomicUsize>) -> MessageMapperFactory {
    let mut factory = MessageMapperFactory::with_builtins();
    factory
        .register(RECORDING_ENGINE, move |c: &MapperConfig<'_>| {
            Ok(Arc::new(RecordingMapper {
                id: c.id.to_string(),
                outgoing: c.outgoing_conditions()?,
                incoming: c.incoming_conditions()?,
                calls: calls.clone(),
            }) as Arc<dyn MessageMapper>)
        })
        .expect("recording engine registers once");
    factory
}

pub fn processor(
    connection_id: &str,
    definition: &PayloadMappingDefinition,
    factory: &MessageMapperFactory,
) -> Result<OutboundMappingProcessor, ConfigurationError> {
    OutboundMappingProcessor::new(
        ConnectionId::from(connection_id),
        ConnectionType::Mqtt5,
        definition,
        factory,
        Arc::new(DefaultProtocolAdapter::new()),
    )
}

pub fn target(address: &str, mapping: &[&str]) -> Target {
    Target::new(address).with_payload_mapping(PayloadMapping::new(mapping.iter().copied()))
}

pub fn thing_event(name: &str) -> Signal {
    Signal::new("things.events:modified")
        .with_entity_id(format!("org.example:{}", name))
        .with_header("correlation-id", format!("corr-{}", name))
        .with_value(serde_json::json!({"name": name}))
}
