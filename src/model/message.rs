//! ExternalMessage: transport-agnostic envelope handed to a transport

use super::adaptable::TopicPath;
use super::headers::Headers;
use serde::Serialize;

/// Message body: text, raw bytes, or nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "lowercase")]
pub enum Payload {
    Text(String),
    Bytes(Vec<u8>),
    Empty,
}

impl Payload {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::Bytes(b) => b.is_empty(),
            Self::Empty => true,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Envelope produced by a mapper.
///
/// `internal_headers` carries the originating signal's headers so a
/// transport can correlate the message with the request that caused it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalMessage {
    pub headers: Headers,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub payload: Payload,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic_path: Option<TopicPath>,
    pub internal_headers: Headers,
}

impl ExternalMessage {
    pub fn new(headers: Headers) -> Self {
        Self {
            headers,
            content_type: None,
            payload: Payload::Empty,
            topic_path: None,
            internal_headers: Headers::new(),
        }
    }

    pub fn text(headers: Headers, text: impl Into<String>) -> Self {
        Self::new(headers).with_payload(Payload::Text(text.into()))
    }

    pub fn bytes(headers: Headers, bytes: Vec<u8>) -> Self {
        Self::new(headers).with_payload(Payload::Bytes(bytes))
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Sets the content type and mirrors it into the `content-type` header.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        let content_type = content_type.into();
        self.headers
            .insert(super::headers::keys::CONTENT_TYPE, content_type.clone());
        self.content_type = Some(content_type);
        self
    }

    pub fn with_topic_path(mut self, topic_path: TopicPath) -> Self {
        self.topic_path = Some(topic_path);
        self
    }

    pub fn with_internal_headers(mut self, headers: Headers) -> Self {
        self.internal_headers = headers;
        self
    }
}
