//! Outbound mapping pipeline
//!
//! Groups targets, deduplicates acknowledgement requests, adapts the signal
//! once and runs every group's mapper chain into ordered outcomes.

mod acks;
mod grouping;
#[cfg(test)]
mod integration_tests;
mod outcome;
mod processor;
mod timer;

pub use acks::{deduplicate_acknowledgements, issued_acknowledgement_labels};
pub use grouping::group_targets;
pub use outcome::MappingOutcome;
pub use processor::{OutboundMappingProcessor, OutboundOutcomes};
pub use timer::MappingTimer;
