//! Scenario tests for the outbound pipeline: grouping, chain order, gating,
//! failure isolation and acknowledgement deduplication end to end

#[cfg(test)]
mod tests {
    use crate::mapping::{
        Conditions, ConfigurationError, MapperConfig, MapperDefinition, MappingError, MessageMapper,
        MessageMapperFactory, PayloadMappingDefinition,
    };
    use crate::model::{
        keys, Adaptable, ConnectionId, ConnectionType, ExternalMessage, Headers, MappedSignal,
        OutboundSignal, PayloadMapping, Signal, Target,
    };
    use crate::outbound::{group_targets, MappingOutcome, OutboundMappingProcessor};
    use crate::protocol::{DefaultProtocolAdapter, ProtocolAdapter};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Emits `count` text messages tagged with its id; `count` comes from
    /// option `count` (default 1). Option `fail: true` makes it fail and
    /// `panic: true` makes it index past the end of an empty list.
    struct TaggingMapper {
        id: String,
        count: usize,
        fail: bool,
        panic: bool,
        outgoing: Conditions,
        incoming: Conditions,
    }

    impl MessageMapper for TaggingMapper {
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
            if self.fail {
                return Err(MappingError::InvalidPayload(format!("{} refuses", self.id)));
            }
            if self.panic {
                let tags: Vec<String> = Vec::new();
                return Ok(vec![ExternalMessage::text(adaptable.headers.clone(), tags[self.count].clone())]);
            }
            Ok((0..self.count)
                .map(|i| ExternalMessage::text(adaptable.headers.clone(), format!("{}#{}", self.id, i)))
                .collect())
        }
    }

    fn factory() -> MessageMapperFactory {
        let mut factory = MessageMapperFactory::with_builtins();
        factory
            .register("tagging", |c: &MapperConfig<'_>| {
                let flag = |name: &str| matches!(c.definition.options.get(name), Some(serde_json::Value::Bool(true)));
                Ok(Arc::new(TaggingMapper {
                    id: c.id.to_string(),
                    count: c.option_positive("count")?.unwrap_or(1),
                    fail: flag("fail"),
                    panic: flag("panic"),
                    outgoing: c.outgoing_conditions()?,
                    incoming: c.incoming_conditions()?,
                }) as Arc<dyn MessageMapper>)
            })
            .unwrap();
        factory
    }

    fn processor_with(definition: PayloadMappingDefinition) -> OutboundMappingProcessor {
        OutboundMappingProcessor::new(
            ConnectionId::from("conn-1"),
            ConnectionType::Amqp091,
            &definition,
            &factory(),
            Arc::new(DefaultProtocolAdapter::new()),
        )
        .unwrap()
    }

    fn tagging() -> MapperDefinition {
        MapperDefinition::new("tagging")
    }

    fn target(address: &str, mapping: &[&str]) -> Target {
        Target::new(address).with_payload_mapping(PayloadMapping::new(mapping.iter().copied()))
    }

    fn signal() -> Signal {
        Signal::new("things.events:modified")
            .with_entity_id("org.example:sensor")
            .with_header(keys::CORRELATION_ID, "corr-7")
            .with_header(keys::CONTENT_TYPE, "application/json")
            .with_value(json!({"temperature": 21}))
    }

    fn payloads(outcomes: &[MappingOutcome<MappedSignal>]) -> Vec<String> {
        outcomes
            .iter()
            .filter_map(|o| o.value())
            .filter_map(|m| m.external_message.payload.as_text().map(str::to_string))
            .collect()
    }

    // ================================================================
    // Grouping Scenarios
    // ================================================================

    // === Scenario: Targets with identical mappings are mapped once ===
    #[test]
    fn identical_mappings_are_mapped_once() {
        let processor = processor_with(PayloadMappingDefinition::new().with_mapper("m1", tagging()));
        let outbound = OutboundSignal::new(signal(), vec![target("t1", &["m1"]), target("t2", &["m1"])]);

        let outcomes = processor.process(&outbound).unwrap();
        assert_eq!(outcomes.len(), 1);
        let mapped = outcomes[0].value().unwrap();
        let addresses: Vec<_> = mapped.targets.iter().map(|t| t.address.as_str()).collect();
        assert_eq!(addresses, vec!["t1", "t2"]);
    }

    // === Scenario: Every target lands in exactly one group ===
    #[test]
    fn grouping_neither_loses_nor_duplicates_targets() {
        let outbound = OutboundSignal::new(
            signal(),
            vec![
                target("t1", &["m1"]),
                target("t2", &["m2"]),
                target("t3", &["m1", "m2"]),
                target("t4", &["m2"]),
                target("t5", &[]),
            ],
        );
        let groups = group_targets(&outbound);
        let mut seen: Vec<&str> = groups
            .iter()
            .flat_map(|g| g.targets.iter().map(|t| t.address.as_str()))
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, vec!["t1", "t2", "t3", "t4", "t5"]);
        for group in &groups {
            assert!(group.targets.iter().all(|t| t.payload_mapping == group.payload_mapping));
        }
    }

    // === Scenario: Fan-out keeps first-seen group order ===
    #[test]
    fn fan_out_follows_first_seen_group_order() {
        let processor = processor_with(
            PayloadMappingDefinition::new()
                .with_mapper("m1", tagging())
                .with_mapper("m2", tagging().with_option("count", json!(2))),
        );
        let outbound = OutboundSignal::new(signal(), vec![target("t1", &["m2"]), target("t2", &["m1"])]);

        let outcomes = processor.process(&outbound).unwrap();
        assert_eq!(payloads(&outcomes), vec!["m2#0", "m2#1", "m1#0"]);
    }

    // ================================================================
    // Chain Scenarios
    // ================================================================

    // === Scenario: Chain order is preserved regardless of message counts ===
    #[test]
    fn chain_outcomes_follow_mapper_order() {
        let processor = processor_with(
            PayloadMappingDefinition::new()
                .with_mapper("m1", tagging().with_option("count", json!(3)))
                .with_mapper("m2", tagging()),
        );
        let outbound = OutboundSignal::new(signal(), vec![target("t1", &["m1", "m2"])]);

        let outcomes = processor.process(&outbound).unwrap();
        assert_eq!(payloads(&outcomes), vec!["m1#0", "m1#1", "m1#2", "m2#0"]);
    }

    // === Scenario: Gated mapper drops without error ===
    #[test]
    fn unmet_condition_yields_exactly_one_drop() {
        let processor = processor_with(
            PayloadMappingDefinition::new().with_mapper(
                "m1",
                tagging()
                    .with_option("count", json!(2))
                    .with_outgoing_condition("live-only", "fn:filter(header:channel,'eq','live')"),
            ),
        );
        let outbound = OutboundSignal::new(signal(), vec![target("t1", &["m1"])]);

        let outcomes = processor.process(&outbound).unwrap();
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].is_dropped());
        assert!(outcomes[0].topic_path().is_some());

        let live = OutboundSignal::new(
            signal().with_header(keys::CHANNEL, "live"),
            vec![target("t1", &["m1"])],
        );
        assert_eq!(processor.process(&live).unwrap().len(), 2);
    }

    // === Scenario: Mapper producing nothing is a drop, not an error ===
    #[test]
    fn empty_output_is_a_drop() {
        let processor = processor_with(
            PayloadMappingDefinition::new().with_mapper("raw", MapperDefinition::new("raw-payload")),
        );
        let outbound = OutboundSignal::new(
            Signal::new("things.events:deleted").with_entity_id("ns:t"),
            vec![target("t1", &["raw"])],
        );

        let outcomes = processor.process(&outbound).unwrap();
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].is_dropped());
    }

    // ================================================================
    // Failure Scenarios
    // ================================================================

    // === Scenario: A failing mapper yields one error with diagnostics ===
    #[test]
    fn failing_mapper_yields_one_error_outcome() {
        let processor = processor_with(
            PayloadMappingDefinition::new()
                .with_mapper("bad", tagging().with_option("fail", json!(true)))
                .with_mapper("good", tagging()),
        );
        let outbound = OutboundSignal::new(signal(), vec![target("t1", &["bad", "good"])]);

        let outcomes = processor.process(&outbound).unwrap();
        assert_eq!(outcomes.len(), 2);
        match &outcomes[0] {
            MappingOutcome::Error { cause, mapper_id, topic_path } => {
                assert_eq!(mapper_id, "bad");
                assert_eq!(cause.mapper_id, "bad");
                assert_eq!(cause.direction, "outbound");
                assert_eq!(cause.content_type, "application/json");
                assert_eq!(cause.correlation_id.as_deref(), Some("corr-7"));
                assert!(topic_path.is_some());
            }
            other => panic!("expected an error outcome, got {other:?}"),
        }
        // sibling mapper in the same chain still ran
        assert!(outcomes[1].is_mapped());
    }

    // === Scenario: Failure in one group never suppresses another ===
    #[test]
    fn failure_is_isolated_to_its_group() {
        let processor = processor_with(
            PayloadMappingDefinition::new()
                .with_mapper("bad", tagging().with_option("fail", json!(true)))
                .with_mapper("good", tagging()),
        );
        let outbound = OutboundSignal::new(signal(), vec![target("g1", &["bad"]), target("g2", &["good"])]);

        let outcomes = processor.process(&outbound).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].is_error());
        assert!(outcomes[1].is_mapped());
        assert_eq!(payloads(&outcomes), vec!["good#0"]);
    }

    // === Scenario: A panicking mapper is contained like any other failure ===
    #[test]
    fn panicking_mapper_becomes_error_outcome() {
        let processor = processor_with(
            PayloadMappingDefinition::new().with_mapper("bad", tagging().with_option("panic", json!(true))),
        );
        let outbound = OutboundSignal::new(signal(), vec![target("g1", &["bad"]), target("g2", &[])]);

        let outcomes = processor.process(&outbound).unwrap();
        assert_eq!(outcomes.len(), 2);
        match &outcomes[0] {
            MappingOutcome::Error { cause, mapper_id, .. } => {
                assert_eq!(mapper_id, "bad");
                assert_eq!(cause.correlation_id.as_deref(), Some("corr-7"));
                assert!(matches!(&cause.source, MappingError::Internal(m) if m.contains("panicked")));
            }
            other => panic!("expected an error outcome, got {other:?}"),
        }
        assert!(outcomes[1].is_mapped());
    }

    // === Scenario: A panic on a worker thread stays in its group ===
    #[test]
    fn panicking_mapper_is_contained_in_parallel_mode() {
        let processor = processor_with(
            PayloadMappingDefinition::new()
                .with_mapper("bad", tagging().with_option("panic", json!(true)))
                .with_mapper("good", tagging()),
        )
        .with_parallelism(2);
        let outbound = OutboundSignal::new(signal(), vec![target("g1", &["bad"]), target("g2", &["good"])]);

        let outcomes = processor.process(&outbound).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].is_error());
        assert_eq!(payloads(&outcomes), vec!["good#0"]);
    }

    // === Scenario: Split mapper rejecting a non-array value ===
    #[test]
    fn builtin_mapper_failure_becomes_error_outcome() {
        let processor = processor_with(
            PayloadMappingDefinition::new().with_mapper("split", MapperDefinition::new("split-array")),
        );
        let outbound = OutboundSignal::new(signal(), vec![target("t1", &["split"])]);
        let outcomes = processor.process(&outbound).unwrap();
        assert_eq!(outcomes.len(), 1);
        assert!(matches!(
            outcomes[0].failure().map(|f| &f.source),
            Some(MappingError::InvalidPayload(_))
        ));
    }

    // === Scenario: Unknown mapper id fails before anything is adapted ===
    #[test]
    fn misconfigured_mapping_fails_before_adaptation() {
        struct CountingAdapter(AtomicUsize);
        impl ProtocolAdapter for CountingAdapter {
            fn to_adaptable(&self, signal: &Signal) -> Adaptable {
                self.0.fetch_add(1, Ordering::SeqCst);
                DefaultProtocolAdapter.to_adaptable(signal)
            }
        }

        let adapter = Arc::new(CountingAdapter(AtomicUsize::new(0)));
        let processor = OutboundMappingProcessor::new(
            ConnectionId::from("conn-1"),
            ConnectionType::Amqp091,
            &PayloadMappingDefinition::new().with_mapper("m1", tagging()),
            &factory(),
            adapter.clone(),
        )
        .unwrap();
        let outbound = OutboundSignal::new(signal(), vec![target("t1", &["m1"]), target("t2", &["ghost"])]);

        let result = processor.process(&outbound);
        assert!(matches!(result, Err(ConfigurationError::UnknownMapperId(id)) if id == "ghost"));
        assert_eq!(adapter.0.load(Ordering::SeqCst), 0);
    }

    // ================================================================
    // Adaptation Scenarios
    // ================================================================

    // === Scenario: Adaptation happens exactly once per signal ===
    #[test]
    fn signal_is_adapted_once_for_all_groups() {
        struct CountingAdapter(AtomicUsize);
        impl ProtocolAdapter for CountingAdapter {
            fn to_adaptable(&self, signal: &Signal) -> Adaptable {
                self.0.fetch_add(1, Ordering::SeqCst);
                DefaultProtocolAdapter.to_adaptable(signal)
            }
        }

        let adapter = Arc::new(CountingAdapter(AtomicUsize::new(0)));
        let processor = OutboundMappingProcessor::new(
            ConnectionId::from("conn-1"),
            ConnectionType::Amqp091,
            &PayloadMappingDefinition::new()
                .with_mapper("m1", tagging())
                .with_mapper("m2", tagging()),
            &factory(),
            adapter.clone(),
        )
        .unwrap();
        let outbound = OutboundSignal::new(
            signal(),
            vec![target("t1", &["m1"]), target("t2", &["m2"]), target("t3", &["m1", "m2"])],
        );

        let outcomes = processor.process(&outbound).unwrap();
        assert_eq!(outcomes.len(), 4);
        assert_eq!(adapter.0.load(Ordering::SeqCst), 1);

        let first = outcomes[0].value().unwrap();
        for outcome in &outcomes[1..] {
            assert!(Arc::ptr_eq(&first.adaptable, &outcome.value().unwrap().adaptable));
        }
    }

    // === Scenario: Issued acknowledgements are removed before adaptation ===
    #[test]
    fn issued_acknowledgements_are_not_requested_downstream() {
        let processor = processor_with(PayloadMappingDefinition::new().with_mapper("m1", tagging()));
        let source = signal().with_header(keys::REQUESTED_ACKS, r#"["conn-1:done","other"]"#);
        let outbound = OutboundSignal::new(
            source,
            vec![target("t1", &["m1"]).with_issued_acknowledgement_label("{{ connection:id }}:done")],
        );

        let outcomes = processor.process(&outbound).unwrap();
        let mapped = outcomes[0].value().unwrap();
        let remaining: Vec<_> = mapped
            .adaptable
            .headers
            .acknowledgement_requests()
            .into_iter()
            .map(|r| r.label.as_str().to_string())
            .collect();
        assert_eq!(remaining, vec!["other"]);
        assert_eq!(
            outbound.source.headers.get(keys::REQUESTED_ACKS),
            Some(r#"["conn-1:done","other"]"#)
        );
    }

    // === Scenario: Responses go back through the inbound mapper ===
    #[test]
    fn response_without_targets_uses_inbound_mapper() {
        let processor = processor_with(
            PayloadMappingDefinition::new()
                .with_mapper("m1", tagging())
                .with_mapper("m2", tagging().with_option("count", json!(2))),
        );
        let response = Signal::new("things.responses:modifyThing")
            .with_entity_id("ns:t")
            .with_headers(Headers::new().with(keys::INBOUND_PAYLOAD_MAPPER, "m2"));

        let outcomes = processor.process(&OutboundSignal::new(response, vec![])).unwrap();
        assert_eq!(payloads(&outcomes), vec!["m2#0", "m2#1"]);
        assert!(outcomes[0].value().unwrap().targets.is_empty());
    }

    // === Scenario: Responses without an inbound mapper use the default ===
    #[test]
    fn response_without_inbound_mapper_uses_default_mapper() {
        let processor = processor_with(PayloadMappingDefinition::new());
        let response = Signal::new("things.responses:modifyThing").with_entity_id("ns:t");

        let outcomes = processor.process(&OutboundSignal::new(response, vec![])).unwrap();
        assert_eq!(outcomes.len(), 1);
        let message = &outcomes[0].value().unwrap().external_message;
        assert_eq!(
            message.content_type.as_deref(),
            Some(crate::mapping::PROTOCOL_CONTENT_TYPE)
        );
    }

    // ================================================================
    // Parallel Scenarios
    // ================================================================

    // === Scenario: Parallel group mapping keeps deterministic order ===
    #[test]
    fn parallel_groups_keep_sequential_order() {
        let definition = (0..6).fold(PayloadMappingDefinition::new(), |d, i| {
            d.with_mapper(format!("m{i}"), tagging().with_option("count", json!(i + 1)))
        });
        let targets: Vec<_> = (0..6)
            .rev()
            .map(|i| target(&format!("t{i}"), &[format!("m{i}").as_str()]))
            .collect();
        let outbound = OutboundSignal::new(signal(), targets);

        let sequential = processor_with(definition.clone()).process(&outbound).unwrap();
        let parallel = processor_with(definition)
            .with_parallelism(4)
            .process(&outbound)
            .unwrap();

        assert_eq!(payloads(&sequential), payloads(&parallel));
        assert_eq!(payloads(&parallel).first().map(String::as_str), Some("m5#0"));
        assert_eq!(parallel.len(), 21);
    }
}
