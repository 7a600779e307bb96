//! A named broadcast channel with at most one inbound handler.

use std::sync::{Arc, Mutex, OnceLock};

use crate::clock::Clock;
use crate::messaging::envelope::{MessageEnvelope, UNTITLED};
use crate::messaging::types::ChannelError;
use crate::observability::metrics;
use crate::transport::{BroadcastTransport, Endpoint, MessageEvent};

/// Inbound message handler.
pub type Handler = Arc<dyn Fn(&MessageEvent) + Send + Sync>;

/// Something a channel can send.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Sent as-is after its timestamp is refreshed.
    Envelope(MessageEnvelope),
    /// Wrapped into an untitled envelope addressed to the channel.
    Text(String),
}

impl From<MessageEnvelope> for Payload {
    fn from(envelope: MessageEnvelope) -> Self {
        Payload::Envelope(envelope)
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

/// One open transport endpoint plus its handler slot.
pub struct Channel {
    name: String,
    endpoint: Mutex<Option<Box<dyn Endpoint>>>,
    handler: Arc<OnceLock<Handler>>,
    clock: Arc<dyn Clock>,
}

impl Channel {
    /// Open `name` on the transport, optionally binding a handler.
    pub fn open(
        transport: &dyn BroadcastTransport,
        name: &str,
        handler: Option<Handler>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ChannelError> {
        if name.is_empty() {
            return Err(ChannelError::InvalidName);
        }

        let endpoint = transport.open(name).map_err(|e| {
            tracing::error!(channel = %name, error = %e, "Failed to open channel");
            ChannelError::from(e)
        })?;

        let slot: Arc<OnceLock<Handler>> = Arc::new(OnceLock::new());
        let inbound = slot.clone();
        endpoint.on_message(Arc::new(move |event: MessageEvent| {
            if let Some(handler) = inbound.get() {
                handler(&event);
            }
        }));

        if let Some(handler) = handler {
            let _ = slot.set(handler);
        }

        Ok(Self {
            name: name.to_string(),
            endpoint: Mutex::new(Some(endpoint)),
            handler: slot,
            clock,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_open(&self) -> bool {
        self.endpoint.lock().expect("channel mutex poisoned").is_some()
    }

    pub fn has_handler(&self) -> bool {
        self.handler.get().is_some()
    }

    /// Bind the inbound handler. Only the first binding sticks.
    pub fn bind_handler(&self, handler: Handler) -> Result<(), ChannelError> {
        self.handler
            .set(handler)
            .map_err(|_| ChannelError::HandlerAlreadyBound(self.name.clone()))
    }

    /// Release the transport. Returns false if already closed.
    pub fn close(&self) -> bool {
        let endpoint = self.endpoint.lock().expect("channel mutex poisoned").take();
        match endpoint {
            Some(endpoint) => {
                endpoint.close();
                true
            }
            None => false,
        }
    }

    /// Send a payload to every other endpoint on this channel.
    pub fn broadcast(&self, payload: impl Into<Payload>) -> Result<(), ChannelError> {
        let guard = self.endpoint.lock().expect("channel mutex poisoned");
        let Some(endpoint) = guard.as_ref() else {
            return Err(ChannelError::Closed(self.name.clone()));
        };

        let envelope = match payload.into() {
            Payload::Envelope(mut envelope) => {
                envelope.update(self.clock.as_ref());
                envelope
            }
            Payload::Text(text) if text.is_empty() => return Err(ChannelError::EmptyPayload),
            Payload::Text(text) => {
                MessageEnvelope::new(UNTITLED, text, self.clock.as_ref()).on_channel(&self.name)
            }
        };

        endpoint.post_message(envelope.to_value())?;
        metrics::record_broadcast(&self.name);
        Ok(())
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("open", &self.is_open())
            .field("handler", &self.has_handler())
            .finish()
    }
}
