//! Peer discovery rules for the control channel.
//!
//! # States (per peer)
//! - Unknown: never heard from
//! - Discovered: sent us a ping to all, or any targeted ping/pong
//!
//! # Transitions
//! ```text
//! ping → all        : discover sender, reply pong → sender (immediately)
//! ping → self       : discover sender, reply pong → sender (jittered)*
//! pong → self       : discover sender, reply ping → sender (jittered)*
//! closing_channel   : close the named channel locally, known senders only
//! anything else     : ignored
//!
//! * only while continuous handshaking is enabled
//! ```
//!
//! With continuous handshaking every pair of known peers keeps exchanging
//! a rate-limited ping/pong for as long as both stay up.

use crate::messaging::envelope::{MessageEnvelope, PING, PONG};

/// Ordered set of discovered peer ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeerSet {
    ids: Vec<String>,
}

impl PeerSet {
    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|known| known == id)
    }

    /// Add a peer. Returns true if it was not known before.
    pub fn insert(&mut self, id: &str) -> bool {
        if self.contains(id) {
            return false;
        }
        self.ids.push(id.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.ids.clone()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }
}

/// When a reply leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timing {
    Immediate,
    Jittered,
}

/// What the registry should do about one control message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaction {
    Ignore,
    Reply {
        message: &'static str,
        target: String,
        timing: Timing,
    },
    CloseChannel(String),
}

/// Decide the reaction to a strict control envelope, updating `peers`.
pub fn react(envelope: &MessageEnvelope, own_id: &str, peers: &mut PeerSet, continuous: bool) -> Reaction {
    if envelope.source == own_id {
        return Reaction::Ignore;
    }
    let sender = envelope.source.as_str();

    if envelope.targets_all() {
        if envelope.is_ping() {
            if peers.insert(sender) {
                tracing::info!(peer = %sender, "Peer discovered");
            }
            return reply(PONG, sender, Timing::Immediate);
        }
        if envelope.is_closing_notice() && peers.contains(sender) {
            return Reaction::CloseChannel(envelope.message.clone());
        }
        return Reaction::Ignore;
    }

    if envelope.target != own_id {
        return Reaction::Ignore;
    }

    if envelope.is_ping() {
        if peers.insert(sender) {
            tracing::info!(peer = %sender, "Peer discovered");
        }
        if continuous {
            return reply(PONG, sender, Timing::Jittered);
        }
        return Reaction::Ignore;
    }

    if envelope.is_pong() {
        if peers.insert(sender) {
            tracing::info!(peer = %sender, "Peer discovered");
        }
        if continuous {
            return reply(PING, sender, Timing::Jittered);
        }
    }

    Reaction::Ignore
}

fn reply(message: &'static str, target: &str, timing: Timing) -> Reaction {
    Reaction::Reply {
        message,
        target: target.to_string(),
        timing,
    }
}
