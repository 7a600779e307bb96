//! Cross-context messaging subsystem.
//!
//! # Data Flow
//! ```text
//! Host code
//!     → registry.rs (add/get/adjust/close channels, broadcast)
//!     → channel.rs (wrap payload in envelope.rs, post on transport)
//!     → transport (other contexts)
//!
//! Control channel:
//!     inbound strict envelope
//!     → handshake.rs (decide reaction, update peer set)
//!     → registry.rs (reply now, reply after jitter, or close a channel)
//! ```
//!
//! # Design Decisions
//! - Only strict envelopes are considered on the control channel; anything
//!   else is foreign noise and dropped without logging an error
//! - A channel binds at most one handler; later bindings are refused
//! - Channel close is idempotent
//! - Remote close notices are honoured only from known peers and are never
//!   re-announced

pub mod channel;
pub mod envelope;
pub mod handshake;
pub mod registry;
pub mod types;

pub use channel::{Channel, Handler, Payload};
pub use envelope::MessageEnvelope;
pub use registry::{Capabilities, ChannelRegistry};
pub use types::{ChannelError, RegistryError, RegistryResult};
