//! Header bag shared by signals, adaptables and external messages

use super::ack::AcknowledgementRequest;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Well-known header keys.
pub mod keys {
    pub const CORRELATION_ID: &str = "correlation-id";
    pub const CHANNEL: &str = "channel";
    pub const CONTENT_TYPE: &str = "content-type";
    pub const REQUESTED_ACKS: &str = "requested-acks";
    pub const INBOUND_PAYLOAD_MAPPER: &str = "inbound-payload-mapper";
}

/// Ordered key→value mapping with case-insensitive keys.
///
/// Keys are stored lowercased; insertion order is preserved and replacing
/// an existing key keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace, returning the previous value.
    pub fn insert(&mut self, key: impl AsRef<str>, value: impl Into<String>) -> Option<String> {
        let key = key.as_ref().to_ascii_lowercase();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let pos = self
            .entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(key))?;
        Some(self.entries.remove(pos).1)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // === Typed accessors ===

    pub fn correlation_id(&self) -> Option<&str> {
        self.get(keys::CORRELATION_ID)
    }

    pub fn channel(&self) -> Option<&str> {
        self.get(keys::CHANNEL)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.get(keys::CONTENT_TYPE)
    }

    /// The mapper id recorded when the signal's request entered the gateway.
    pub fn inbound_payload_mapper(&self) -> Option<&str> {
        self.get(keys::INBOUND_PAYLOAD_MAPPER)
    }

    /// Decode `requested-acks` (a JSON array). Entries that fail to decode
    /// are skipped; an absent or malformed header yields an empty list.
    pub fn acknowledgement_requests(&self) -> Vec<AcknowledgementRequest> {
        let Some(raw) = self.get(keys::REQUESTED_ACKS) else {
            return Vec::new();
        };
        match serde_json::from_str::<Vec<serde_json::Value>>(raw) {
            Ok(values) => values
                .into_iter()
                .filter_map(|v| serde_json::from_value(v).ok())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    /// Copy of these headers with `requested-acks` replaced.
    pub fn with_acknowledgement_requests(&self, requests: &[AcknowledgementRequest]) -> Self {
        let encoded = serde_json::to_string(requests).unwrap_or_else(|_| "[]".to_string());
        self.clone().with(keys::REQUESTED_ACKS, encoded)
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.insert(k, v);
        }
        headers
    }
}

impl Serialize for Headers {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

struct HeadersVisitor;

impl<'de> Visitor<'de> for HeadersVisitor {
    type Value = Headers;

    fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("a map of header names to values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Headers, A::Error> {
        let mut headers = Headers::new();
        while let Some((key, value)) = access.next_entry::<String, serde_json::Value>()? {
            let value = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            headers.insert(key, value);
        }
        Ok(headers)
    }
}

impl<'de> Deserialize<'de> for Headers {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(HeadersVisitor)
    }
}
