//! Acknowledgement deduplication ahead of protocol adaptation
//!
//! A target that issues acknowledgement label `L` confirms `L` itself once
//! its message is published, so a request for `L` carried by the signal is
//! removed before the signal is adapted and handed to mappers. Entries of
//! `requested-acks` that do not decode as requests are passed through as
//! they are.

use crate::mapping::placeholders::resolve_connection_id;
use crate::model::{keys, AcknowledgementLabel, AcknowledgementRequest, ConnectionId, OutboundSignal, Signal};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Labels the signal's targets issue, with `{{ connection:id }}` resolved.
///
/// Labels that keep an unresolved placeholder or are not valid labels after
/// resolution are ignored.
pub fn issued_acknowledgement_labels(
    outbound: &OutboundSignal,
    connection_id: &ConnectionId,
) -> BTreeSet<AcknowledgementLabel> {
    outbound
        .targets
        .iter()
        .filter_map(|target| target.issued_acknowledgement_label.as_deref())
        .filter_map(|template| resolve_connection_id(connection_id, template))
        .filter_map(|label| AcknowledgementLabel::parse(label).ok())
        .collect()
}

/// The signal to adapt: the source with requests for target-issued labels
/// removed.
///
/// Returns the caller's signal untouched when nothing would be removed, so
/// applying this to an already deduplicated signal is a no-op.
pub fn deduplicate_acknowledgements(outbound: &OutboundSignal, connection_id: &ConnectionId) -> Arc<Signal> {
    let issued = issued_acknowledgement_labels(outbound, connection_id);
    if issued.is_empty() {
        return outbound.source.clone();
    }
    remove_requests(&outbound.source, &issued)
}

fn remove_requests(source: &Arc<Signal>, issued: &BTreeSet<AcknowledgementLabel>) -> Arc<Signal> {
    let Some(entries) = source
        .headers
        .get(keys::REQUESTED_ACKS)
        .and_then(|raw| serde_json::from_str::<Vec<Value>>(raw).ok())
    else {
        return source.clone();
    };

    let mut kept = Vec::with_capacity(entries.len());
    let mut removed = Vec::new();
    for entry in entries {
        match serde_json::from_value::<AcknowledgementRequest>(entry.clone()) {
            Ok(request) if issued.contains(&request.label) => removed.push(request.label),
            Ok(_) => kept.push(entry),
            Err(_) => {
                tracing::debug!(entry = %entry, "keeping undecodable acknowledgement request");
                kept.push(entry);
            }
        }
    }
    if removed.is_empty() {
        return source.clone();
    }

    tracing::debug!(
        removed = ?removed.iter().map(|l| l.as_str()).collect::<Vec<_>>(),
        "removing acknowledgement requests issued by targets"
    );
    let headers = source
        .headers
        .clone()
        .with(keys::REQUESTED_ACKS, Value::Array(kept).to_string());
    Arc::new(Signal::clone(source).with_headers(headers))
}
