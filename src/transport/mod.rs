//! Broadcast transport subsystem.
//!
//! # Data Flow
//! ```text
//! Channel::broadcast(envelope)
//!     → Endpoint::post_message(json value)
//!     → LocalBus queue (recipients fixed at post time, sender excluded)
//!     → deliver_pending() / pump task
//!     → every other open endpoint's on_message callback
//! ```
//!
//! # Design Decisions
//! - The contract is the only thing the messaging layer depends on;
//!   any environment-specific broadcast mechanism can implement it
//! - No self-delivery: a poster never hears its own message
//! - Delivery order per channel equals post order; nothing is batched
//!   or reordered
//! - Callbacks run with no transport lock held, so handlers may post

pub mod local;

use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

pub use local::LocalBus;

/// Errors raised by a broadcast transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Invalid channel name")]
    InvalidName,

    #[error("Endpoint #{0} is closed")]
    Closed(String),

    #[error("Transport unavailable: {0}")]
    Unavailable(String),
}

/// A message delivered to an endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent {
    /// Channel the message arrived on.
    pub channel: String,
    /// Raw payload as posted by the sender.
    pub data: Value,
}

/// Callback invoked for each inbound message.
pub type MessageCallback = Arc<dyn Fn(MessageEvent) + Send + Sync>;

/// Opens named broadcast endpoints.
pub trait BroadcastTransport: Send + Sync {
    fn open(&self, name: &str) -> Result<Box<dyn Endpoint>, TransportError>;
}

/// One open handle on a named broadcast channel.
pub trait Endpoint: Send + Sync {
    fn name(&self) -> &str;

    /// Deliver `data` to every other open endpoint with the same name.
    fn post_message(&self, data: Value) -> Result<(), TransportError>;

    /// Replace the inbound callback.
    fn on_message(&self, callback: MessageCallback);

    /// Stop sending and receiving. Closing twice is harmless.
    fn close(&self);
}
