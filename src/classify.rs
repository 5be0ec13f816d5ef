//! Signal classification predicates
//!
//! Read-only helpers that answer questions about a signal from its type tag
//! and headers. Condition placeholders and the protocol adapter use them to
//! tell live-channel traffic from twin traffic.

use crate::model::{EntityId, Signal};

pub const CHANNEL_LIVE: &str = "live";

pub const MESSAGE_COMMAND_PREFIX: &str = "messages.commands:";
pub const THING_COMMAND_PREFIX: &str = "things.commands:";
pub const MESSAGE_RESPONSE_PREFIX: &str = "messages.responses:";
pub const THING_RESPONSE_PREFIX: &str = "things.responses:";

/// A message command, or a thing command sent on the live channel.
pub fn is_live_command(signal: &Signal) -> bool {
    is_message_command(signal) || (is_thing_command(signal) && is_channel_live(signal))
}

/// A message command response, or a thing command response on the live channel.
pub fn is_live_command_response(signal: &Signal) -> bool {
    is_message_command_response(signal)
        || (is_thing_command_response(signal) && is_channel_live(signal))
}

pub fn is_message_command(signal: &Signal) -> bool {
    signal.kind.starts_with(MESSAGE_COMMAND_PREFIX)
}

pub fn is_thing_command(signal: &Signal) -> bool {
    signal.kind.starts_with(THING_COMMAND_PREFIX)
}

pub fn is_message_command_response(signal: &Signal) -> bool {
    signal.kind.starts_with(MESSAGE_RESPONSE_PREFIX)
}

pub fn is_thing_command_response(signal: &Signal) -> bool {
    signal.kind.starts_with(THING_RESPONSE_PREFIX)
}

/// True if the `channel` header is exactly `live`.
pub fn is_channel_live(signal: &Signal) -> bool {
    signal.headers.channel() == Some(CHANNEL_LIVE)
}

pub fn entity_id(signal: &Signal) -> Option<&EntityId> {
    signal.entity_id.as_ref()
}

pub fn correlation_id(signal: &Signal) -> Option<&str> {
    signal.headers.correlation_id()
}
