//! The message envelope exchanged between contexts.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::clock::Clock;

/// Title given to payloads that arrive without one.
pub const UNTITLED: &str = "untitled";
/// Target value addressing every peer.
pub const TARGET_ALL: &str = "all";
/// Title of peer discovery traffic.
pub const HANDSHAKE: &str = "handshake";
pub const PING: &str = "ping";
pub const PONG: &str = "pong";
/// Title of the control notice announcing a channel shutdown.
pub const CLOSING_CHANNEL: &str = "closing_channel";
/// Title of administrative notices posted on user channels.
pub const ADMIN: &str = "admin";

/// A named message travelling over a channel.
///
/// Empty strings stand for absent fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageEnvelope {
    pub title: String,
    pub message: String,
    pub channel: String,
    pub source: String,
    pub target: String,
    pub timestamp: String,
}

impl MessageEnvelope {
    /// New envelope stamped with the current time.
    pub fn new(title: impl Into<String>, message: impl Into<String>, clock: &dyn Clock) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            timestamp: clock.current_time(),
            ..Default::default()
        }
    }

    pub fn on_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    pub fn from_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn to_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    /// Refresh the timestamp before re-sending.
    pub fn update(&mut self, clock: &dyn Clock) {
        self.timestamp = clock.current_time();
    }

    /// A payload is valid when it carries a message.
    pub fn is_valid(&self) -> bool {
        !self.message.is_empty()
    }

    /// Strict envelopes have every identifying field populated.
    pub fn is_strict(&self) -> bool {
        self.is_valid()
            && !self.title.is_empty()
            && !self.channel.is_empty()
            && !self.source.is_empty()
            && !self.target.is_empty()
    }

    pub fn targets_all(&self) -> bool {
        self.target == TARGET_ALL
    }

    pub fn is_ping(&self) -> bool {
        self.title == HANDSHAKE && self.message == PING
    }

    pub fn is_pong(&self) -> bool {
        self.title == HANDSHAKE && self.message == PONG
    }

    pub fn is_closing_notice(&self) -> bool {
        self.title == CLOSING_CHANNEL
    }

    /// Decode a raw payload only if it is a strict envelope.
    pub fn parse_strict(data: &Value) -> Option<Self> {
        if !data.is_object() {
            return None;
        }
        let envelope = Self::from_fields(data.as_object()?);
        envelope.is_strict().then_some(envelope)
    }

    /// Coerce an arbitrary payload into an envelope.
    ///
    /// Text is first tried as JSON and otherwise treated as the message
    /// body. Objects without a message are wrapped whole as JSON text.
    /// Returns `None` only for absent or empty payloads. The result always
    /// carries a fresh timestamp.
    pub fn from_value(data: &Value, clock: &dyn Clock) -> Option<Self> {
        let data = match data {
            Value::Null | Value::Bool(false) => return None,
            Value::String(text) if text.is_empty() => return None,
            Value::String(text) => match serde_json::from_str::<Value>(text) {
                Ok(parsed @ Value::Object(_)) => parsed,
                _ => {
                    let mut wrapped = Map::new();
                    wrapped.insert("message".into(), Value::String(text.clone()));
                    Value::Object(wrapped)
                }
            },
            other => other.clone(),
        };

        let mut envelope = match data.as_object() {
            Some(fields) => Self::from_fields(fields),
            None => Self::default(),
        };

        if !envelope.is_valid() {
            envelope = Self {
                message: data.to_string(),
                ..Default::default()
            };
        }
        if envelope.title.is_empty() {
            envelope.title = UNTITLED.to_string();
        }
        envelope.update(clock);
        Some(envelope)
    }

    fn from_fields(fields: &Map<String, Value>) -> Self {
        let text = |key: &str| {
            fields
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        Self {
            title: text("title"),
            message: text("message"),
            channel: text("channel"),
            source: text("source"),
            target: text("target"),
            timestamp: text("timestamp"),
        }
    }

    /// JSON form posted on the transport.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
