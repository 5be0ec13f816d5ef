//! OutboundMappingProcessor: signal + targets → per-mapper outcomes
//!
//! One processor exists per connection. It owns the connection's mapper
//! registry and protocol adapter and holds no other state, so `process` can
//! run concurrently from any number of threads.
//!
//! An invocation groups targets by payload mapping, resolves each group's
//! mapper chain, drops acknowledgement requests the targets satisfy
//! themselves, adapts the signal once, then runs every chain. A mapper
//! failure, including a panicking transform, becomes an `Error` outcome and
//! never stops sibling mappers or groups. Only a mapping that names an
//! unknown mapper fails the call.

use super::acks::deduplicate_acknowledgements;
use super::grouping::group_targets;
use super::outcome::MappingOutcome;
use super::timer::MappingTimer;
use crate::mapping::{
    ConditionContext, ConfigurationError, MappingError, MappingFailure, MessageMapper,
    MessageMapperFactory, MessageMapperRegistry, PayloadMappingDefinition,
};
use crate::model::{Adaptable, ConnectionId, ConnectionType, MappableSignal, MappedSignal, OutboundSignal};
use crate::protocol::ProtocolAdapter;
use crate::telemetry::MappingMetrics;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

/// Outcomes of one invocation, in group then mapper-chain order.
pub type OutboundOutcomes = Vec<MappingOutcome<MappedSignal>>;

/// A group with its resolved mapper chain.
type MapperChain<'a> = (&'a MappableSignal, Vec<Arc<dyn MessageMapper>>);

pub struct OutboundMappingProcessor {
    connection_id: ConnectionId,
    connection_type: ConnectionType,
    registry: MessageMapperRegistry,
    adapter: Arc<dyn ProtocolAdapter>,
    metrics: Option<Arc<MappingMetrics>>,
    parallelism: usize,
}

impl OutboundMappingProcessor {
    /// Build the connection's mappers from `definition`.
    ///
    /// Fails if a mapper names an unknown engine or has invalid options or
    /// conditions.
    pub fn new(
        connection_id: ConnectionId,
        connection_type: ConnectionType,
        definition: &PayloadMappingDefinition,
        factory: &MessageMapperFactory,
        adapter: Arc<dyn ProtocolAdapter>,
    ) -> Result<Self, ConfigurationError> {
        let registry = factory.registry_of(&connection_id, definition)?;
        tracing::debug!(
            connection_id = %connection_id,
            connection_type = %connection_type,
            mappers = ?registry.ids(),
            "outbound mapping processor created"
        );
        Ok(Self {
            connection_id,
            connection_type,
            registry,
            adapter,
            metrics: None,
            parallelism: 1,
        })
    }

    /// Report latencies and outcome counts to `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<MappingMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Map up to `parallelism` target groups at once. Values below 1 are
    /// treated as 1.
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    pub fn connection_id(&self) -> &ConnectionId {
        &self.connection_id
    }

    pub fn connection_type(&self) -> ConnectionType {
        self.connection_type
    }

    pub fn registry(&self) -> &MessageMapperRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> Option<&Arc<MappingMetrics>> {
        self.metrics.as_ref()
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Map an outbound signal for all of its targets.
    pub fn process(&self, outbound: &OutboundSignal) -> Result<OutboundOutcomes, ConfigurationError> {
        let span = tracing::debug_span!(
            "outbound_mapping",
            connection_id = %self.connection_id,
            correlation_id = outbound.source.headers.correlation_id().unwrap_or_default(),
        );
        let _entered = span.enter();

        let groups = group_targets(outbound);
        let chains = self.resolve_chains(&groups)?;

        let timer = MappingTimer::new(self.connection_id.clone(), self.metrics.clone());
        let outcomes = timer.overall(|| self.run(outbound, &chains, &timer));

        if let Some(metrics) = &self.metrics {
            for outcome in &outcomes {
                metrics.record_outcome(&self.connection_id, outcome.kind());
            }
        }
        Ok(outcomes)
    }

    /// Resolve every group's mapper chain before anything is adapted.
    fn resolve_chains<'a>(
        &self,
        groups: &'a [MappableSignal],
    ) -> Result<Vec<MapperChain<'a>>, ConfigurationError> {
        groups
            .iter()
            .map(|group| {
                self.registry.mappers_for(&group.payload_mapping).map(|mappers| {
                    tracing::debug!(
                        targets = group.targets.len(),
                        mappers = ?mappers.iter().map(|m| m.id()).collect::<Vec<_>>(),
                        "resolved mappers for target group"
                    );
                    (group, mappers)
                })
            })
            .collect()
    }

    fn run(&self, outbound: &OutboundSignal, chains: &[MapperChain<'_>], timer: &MappingTimer) -> OutboundOutcomes {
        let signal = deduplicate_acknowledgements(outbound, &self.connection_id);
        let adaptable = timer.protocol(|| {
            let adaptable = self.adapter.to_adaptable(&signal);
            match &outbound.extra {
                Some(extra) => self.adapter.set_extra(adaptable, extra),
                None => adaptable,
            }
        });
        let adaptable = Arc::new(adaptable);

        let per_group = if self.parallelism > 1 && chains.len() > 1 {
            self.map_groups_parallel(chains, &adaptable, timer)
        } else {
            chains
                .iter()
                .map(|(group, mappers)| self.map_group(group, mappers, &adaptable, timer))
                .collect()
        };
        per_group.into_iter().flatten().collect()
    }

    /// Map groups on scoped threads; results come back in group order.
    fn map_groups_parallel(
        &self,
        chains: &[MapperChain<'_>],
        adaptable: &Arc<Adaptable>,
        timer: &MappingTimer,
    ) -> Vec<OutboundOutcomes> {
        let chunk_size = chains.len().div_ceil(self.parallelism);
        std::thread::scope(|scope| {
            let handles: Vec<_> = chains
                .chunks(chunk_size)
                .map(|chunk| {
                    let span = tracing::Span::current();
                    scope.spawn(move || {
                        let _entered = span.enter();
                        chunk
                            .iter()
                            .map(|(group, mappers)| self.map_group(group, mappers, adaptable, timer))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|handle| match handle.join() {
                    Ok(outcomes) => outcomes,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        })
    }

    fn map_group(
        &self,
        group: &MappableSignal,
        mappers: &[Arc<dyn MessageMapper>],
        adaptable: &Arc<Adaptable>,
        timer: &MappingTimer,
    ) -> OutboundOutcomes {
        mappers
            .iter()
            .flat_map(|mapper| self.apply_mapper(group, mapper.as_ref(), adaptable, timer))
            .collect()
    }

    /// Run one mapper for one group under its outgoing conditions.
    fn apply_mapper(
        &self,
        group: &MappableSignal,
        mapper: &dyn MessageMapper,
        adaptable: &Arc<Adaptable>,
        timer: &MappingTimer,
    ) -> OutboundOutcomes {
        let topic_path = &adaptable.topic_path;
        let context = ConditionContext::for_outbound(group, topic_path, &self.connection_id);
        if !mapper.outgoing_conditions().evaluate(&context) {
            tracing::debug!(
                mapper = mapper.id(),
                conditions = %mapper.outgoing_conditions(),
                "outgoing conditions not met, dropping"
            );
            return vec![MappingOutcome::dropped(Some(topic_path.clone()))];
        }

        let result = timer.payload(mapper.id(), || {
            catch_unwind(AssertUnwindSafe(|| mapper.map(adaptable)))
                .unwrap_or_else(|panic| Err(MappingError::Internal(panic_message(panic.as_ref()))))
        });
        match result {
            Ok(messages) if messages.is_empty() => {
                tracing::debug!(mapper = mapper.id(), "mapper produced no messages, dropping");
                vec![MappingOutcome::dropped(Some(topic_path.clone()))]
            }
            Ok(messages) => {
                tracing::debug!(mapper = mapper.id(), count = messages.len(), "mapped outbound signal");
                messages
                    .into_iter()
                    .map(|message| {
                        let message = message
                            .with_topic_path(topic_path.clone())
                            .with_internal_headers(group.source.headers.clone());
                        MappingOutcome::mapped(
                            MappedSignal::new(group, adaptable.clone(), message),
                            Some(topic_path.clone()),
                        )
                    })
                    .collect()
            }
            Err(error) => {
                let failure = MappingFailure::outbound(mapper.id(), &adaptable.headers, error);
                tracing::warn!(
                    mapper = mapper.id(),
                    content_type = %failure.content_type,
                    error = %failure,
                    "outbound mapping failed"
                );
                vec![MappingOutcome::error(mapper.id(), failure, Some(topic_path.clone()))]
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("mapper panicked: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("mapper panicked: {}", message)
    } else {
        "mapper panicked".to_string()
    }
}

impl std::fmt::Debug for OutboundMappingProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutboundMappingProcessor")
            .field("connection_id", &self.connection_id)
            .field("connection_type", &self.connection_type)
            .field("registry", &self.registry)
            .field("parallelism", &self.parallelism)
            .finish()
    }
}
