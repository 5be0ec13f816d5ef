//! Data model of the outbound mapping pipeline

mod ack;
mod adaptable;
mod connection;
mod headers;
mod message;
mod outbound;
mod signal;
mod target;

pub use ack::{AcknowledgementLabel, AcknowledgementRequest, InvalidLabel};
pub use adaptable::{Adaptable, TopicPath, UNKNOWN_SEGMENT};
pub use connection::{ConnectionId, ConnectionType};
pub use headers::{keys, Headers};
pub use message::{ExternalMessage, Payload};
pub use outbound::{MappableSignal, MappedSignal, OutboundSignal};
pub use signal::{EntityId, Signal};
pub use target::{PayloadMapping, Target};
