//! MessageMapper trait: the contract payload mappers implement
//!
//! A mapper turns one adaptable into zero or more external messages. It
//! declares conditions per direction; the pipeline only invokes it when its
//! outgoing conditions hold for the signal being mapped.

use super::conditions::Conditions;
use super::error::MappingError;
use crate::model::{Adaptable, ExternalMessage};

pub trait MessageMapper: Send + Sync {
    /// Stable id, as referenced by payload mappings
    fn id(&self) -> &str;

    /// Conditions gating inbound (external → internal) mapping
    fn incoming_conditions(&self) -> &Conditions;

    /// Conditions gating outbound (internal → external) mapping
    fn outgoing_conditions(&self) -> &Conditions;

    /// Map an adaptable to external messages.
    ///
    /// An empty vec means the mapper deliberately produced nothing. Must
    /// not block; the pipeline imposes no timeout.
    fn map(&self, adaptable: &Adaptable) -> Result<Vec<ExternalMessage>, MappingError>;
}

impl std::fmt::Debug for dyn MessageMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageMapper")
            .field("id", &self.id())
            .field("outgoing_conditions", &self.outgoing_conditions().len())
            .finish()
    }
}
