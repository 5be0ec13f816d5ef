//! Target grouping: one mappable signal per distinct payload mapping

use crate::model::{MappableSignal, OutboundSignal, PayloadMapping, Target};

/// Partition the signal's targets by payload mapping.
///
/// Groups appear in first-seen order of their mapping; targets keep their
/// relative order inside a group. A signal without targets (a response or
/// error) yields a single group mapped with the mapper that handled the
/// inbound request, or with the empty mapping if none is recorded.
pub fn group_targets(outbound: &OutboundSignal) -> Vec<MappableSignal> {
    if outbound.targets.is_empty() {
        let payload_mapping = outbound
            .source
            .headers
            .inbound_payload_mapper()
            .map(|id| PayloadMapping::new([id]))
            .unwrap_or_default();
        return vec![MappableSignal {
            source: outbound.source.clone(),
            targets: Vec::new(),
            payload_mapping,
        }];
    }

    outbound
        .targets
        .iter()
        .fold(Vec::<(PayloadMapping, Vec<Target>)>::new(), |mut groups, target| {
            match groups
                .iter_mut()
                .find(|(mapping, _)| *mapping == target.payload_mapping)
            {
                Some((_, targets)) => targets.push(target.clone()),
                None => groups.push((target.payload_mapping.clone(), vec![target.clone()])),
            }
            groups
        })
        .into_iter()
        .map(|(payload_mapping, targets)| MappableSignal {
            source: outbound.source.clone(),
            targets,
            payload_mapping,
        })
        .collect()
}
