//! Connection identity consumed by the mapping pipeline

use serde::{Deserialize, Serialize};

/// Unique identifier for a connection
///
/// Serializes as a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ConnectionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Transport family of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionType {
    #[serde(rename = "amqp-091")]
    Amqp091,
    #[serde(rename = "amqp-10")]
    Amqp10,
    Mqtt,
    #[serde(rename = "mqtt-5")]
    Mqtt5,
    Kafka,
    HttpPush,
}

impl ConnectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Amqp091 => "amqp-091",
            Self::Amqp10 => "amqp-10",
            Self::Mqtt => "mqtt",
            Self::Mqtt5 => "mqtt-5",
            Self::Kafka => "kafka",
            Self::HttpPush => "http-push",
        }
    }
}

impl std::fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
