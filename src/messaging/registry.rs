//! Channel registry and peer discovery.
//!
//! # Responsibilities
//! - Own the user-visible channels (unique names, insertion order)
//! - Own the control channel and run the handshake over it
//! - Track discovered peers
//! - Close channels after a grace period, announcing it to peers
//!
//! # Design Decisions
//! - One registry per context, constructed by the host and passed around;
//!   `init` runs once and a second call fails
//! - Registry state sits behind one mutex, never held while posting or
//!   while running scheduled work
//! - Inbound handlers and scheduled tasks hold a weak reference, so a
//!   dropped registry quietly stops reacting

use rand::Rng;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use crate::clock::{Clock, IdGenerator};
use crate::config::BroadcastConfig;
use crate::lifecycle::Scheduler;
use crate::messaging::channel::{Channel, Handler, Payload};
use crate::messaging::envelope::{MessageEnvelope, ADMIN, CLOSING_CHANNEL, HANDSHAKE, PING, TARGET_ALL};
use crate::messaging::handshake::{self, PeerSet, Reaction, Timing};
use crate::messaging::types::{RegistryError, RegistryResult};
use crate::observability::metrics;
use crate::transport::{BroadcastTransport, MessageEvent};

/// Text of the admin notice posted on a channel about to close.
pub const CLOSING_NOTICE: &str = "closing channel";

/// Collaborators a registry needs from its host.
#[derive(Clone)]
pub struct Capabilities {
    pub transport: Arc<dyn BroadcastTransport>,
    pub scheduler: Arc<dyn Scheduler>,
    pub clock: Arc<dyn Clock>,
    pub ids: Arc<dyn IdGenerator>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Running,
    TornDown,
}

struct RegistryState {
    phase: Phase,
    id: String,
    channels: Vec<Arc<Channel>>,
    internal: Option<Arc<Channel>>,
    peers: PeerSet,
}

struct RegistryInner {
    config: BroadcastConfig,
    caps: Capabilities,
    state: Mutex<RegistryState>,
}

/// Registry of named channels for one execution context.
#[derive(Clone)]
pub struct ChannelRegistry {
    inner: Arc<RegistryInner>,
}

impl ChannelRegistry {
    pub fn new(config: BroadcastConfig, caps: Capabilities) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                config,
                caps,
                state: Mutex::new(RegistryState {
                    phase: Phase::Idle,
                    id: String::new(),
                    channels: Vec::new(),
                    internal: None,
                    peers: PeerSet::default(),
                }),
            }),
        }
    }

    /// Generate our id, open the control channel and ping everyone.
    pub fn init(&self) -> RegistryResult<()> {
        let inner = &self.inner;
        {
            let mut state = inner.lock();
            if state.phase != Phase::Idle {
                tracing::warn!(source = "ChannelRegistry.init", "Init refused: already initialized");
                return Err(RegistryError::AlreadyInitialized);
            }

            let weak: Weak<RegistryInner> = Arc::downgrade(inner);
            let handler: Handler = Arc::new(move |event: &MessageEvent| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_internal_message(event);
                }
            });
            let internal = Channel::open(
                inner.caps.transport.as_ref(),
                &inner.config.internal_channel,
                Some(handler),
                inner.caps.clock.clone(),
            )?;

            state.id = inner.caps.ids.random_id();
            state.internal = Some(Arc::new(internal));
            state.phase = Phase::Running;
            tracing::info!(source = "ChannelRegistry.init", id = %state.id, "Init complete.");
        }

        tracing::info!(source = "ChannelRegistry.init", "Arranging handshakes...");
        inner.internal_broadcast(HANDSHAKE, PING, TARGET_ALL);
        Ok(())
    }

    /// Our peer id, once initialized.
    pub fn id(&self) -> Option<String> {
        let state = self.inner.lock();
        (state.phase != Phase::Idle).then(|| state.id.clone())
    }

    pub fn is_running(&self) -> bool {
        self.inner.lock().phase == Phase::Running
    }

    /// Discovered peers, in discovery order.
    pub fn peers(&self) -> Vec<String> {
        self.inner.lock().peers.to_vec()
    }

    pub fn is_known_peer(&self, id: &str) -> bool {
        self.inner.lock().peers.contains(id)
    }

    /// Names of the user-visible channels, in insertion order.
    pub fn channel_names(&self) -> Vec<String> {
        self.inner
            .lock()
            .channels
            .iter()
            .map(|c| c.name().to_string())
            .collect()
    }

    /// Open a new user channel.
    pub fn add_channel(&self, name: &str) -> RegistryResult<()> {
        let inner = &self.inner;
        let mut state = inner.lock();
        if state.phase != Phase::Running {
            return Err(RegistryError::NotRunning);
        }
        if name.is_empty() {
            return Err(RegistryError::InvalidName);
        }
        if name == inner.config.internal_channel {
            return Err(RegistryError::ReservedName(name.to_string()));
        }
        if state.channels.iter().any(|c| c.name() == name) {
            tracing::warn!(source = "ChannelRegistry.add_channel", channel = %name, "Channel already exists");
            return Err(RegistryError::ChannelExists(name.to_string()));
        }

        let channel = Channel::open(inner.caps.transport.as_ref(), name, None, inner.caps.clock.clone())?;
        state.channels.push(Arc::new(channel));
        tracing::info!(source = "ChannelRegistry.add_channel", "Channel #{} has been added.", name);
        Ok(())
    }

    /// Look up a user channel by name.
    pub fn get_channel(&self, name: &str) -> Option<Arc<Channel>> {
        if name.is_empty() {
            return None;
        }
        self.inner
            .lock()
            .channels
            .iter()
            .find(|c| c.name() == name)
            .cloned()
    }

    /// Bind the handler of a user channel.
    pub fn adjust_channel(&self, name: &str, handler: Handler) -> RegistryResult<()> {
        let channel = self.require(name)?;
        tracing::debug!(source = "ChannelRegistry.adjust_channel", channel = %name, "Adjusting channel");
        channel.bind_handler(handler)?;
        Ok(())
    }

    /// Send an envelope on the channel it names.
    pub fn broadcast(&self, envelope: MessageEnvelope) -> RegistryResult<()> {
        let channel = self.require(&envelope.channel)?;
        channel.broadcast(envelope)?;
        Ok(())
    }

    /// Send a payload on a named channel.
    pub fn broadcast_on_channel(&self, name: &str, payload: impl Into<Payload>) -> RegistryResult<()> {
        let channel = self.require(name)?;
        channel.broadcast(payload)?;
        Ok(())
    }

    /// Close a channel after the grace delay.
    ///
    /// With `notify`, peers are told first (control channel) and an admin
    /// notice goes out on the channel itself. The channel keeps working
    /// until the grace delay elapses.
    pub fn close_channel(&self, name: &str, notify: bool) -> RegistryResult<()> {
        self.inner.close_channel(name, notify)
    }

    /// Close every channel immediately and stop reacting to traffic.
    pub fn teardown(&self) {
        let (internal, channels) = {
            let mut state = self.inner.lock();
            if state.phase == Phase::TornDown {
                return;
            }
            state.phase = Phase::TornDown;
            state.peers.clear();
            (state.internal.take(), std::mem::take(&mut state.channels))
        };

        for channel in channels.iter().chain(internal.iter()) {
            channel.close();
        }
        metrics::record_peer_count(0);
        tracing::info!(source = "ChannelRegistry.teardown", closed = channels.len(), "Registry torn down");
    }

    fn require(&self, name: &str) -> RegistryResult<Arc<Channel>> {
        self.get_channel(name)
            .ok_or_else(|| RegistryError::ChannelNotFound(name.to_string()))
    }
}

impl RegistryInner {
    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().expect("registry mutex poisoned")
    }

    fn internal_broadcast(&self, title: &str, message: &str, target: &str) {
        let (internal, id) = {
            let state = self.lock();
            if state.phase != Phase::Running {
                return;
            }
            (state.internal.clone(), state.id.clone())
        };
        let Some(internal) = internal else {
            return;
        };

        tracing::debug!(
            source = "ChannelRegistry.internal_broadcast",
            "Sending {}.{} to {}",
            title,
            message,
            target
        );
        let envelope = MessageEnvelope::new(title, message, self.caps.clock.as_ref())
            .on_channel(&self.config.internal_channel)
            .from_source(id)
            .to_target(target);

        if let Err(e) = internal.broadcast(envelope) {
            tracing::error!(source = "ChannelRegistry.internal_broadcast", error = %e, "Control broadcast failed");
        } else {
            metrics::record_handshake(title, message);
        }
    }

    fn on_internal_message(self: &Arc<Self>, event: &MessageEvent) {
        let Some(envelope) = MessageEnvelope::parse_strict(&event.data) else {
            return;
        };

        let reaction = {
            let mut state = self.lock();
            if state.phase != Phase::Running {
                return;
            }
            let known = state.peers.len();
            let id = state.id.clone();
            let reaction = handshake::react(&envelope, &id, &mut state.peers, self.config.continuous_handshake);
            if state.peers.len() != known {
                metrics::record_peer_count(state.peers.len());
            }
            reaction
        };

        match reaction {
            Reaction::Ignore => {}
            Reaction::Reply {
                message,
                target,
                timing: Timing::Immediate,
            } => {
                tracing::debug!(
                    source = "ChannelRegistry.on_internal_message",
                    "Received {}.{} from {}",
                    envelope.title,
                    envelope.message,
                    envelope.source
                );
                self.internal_broadcast(HANDSHAKE, message, &target);
            }
            Reaction::Reply {
                message,
                target,
                timing: Timing::Jittered,
            } => {
                let delay = self.jitter();
                let weak = Arc::downgrade(self);
                self.caps.scheduler.schedule(
                    delay,
                    Box::new(move || {
                        if let Some(inner) = weak.upgrade() {
                            tracing::trace!(
                                source = "ChannelRegistry.on_internal_message",
                                "Received {}.{} from {}",
                                envelope.title,
                                envelope.message,
                                envelope.source
                            );
                            inner.internal_broadcast(HANDSHAKE, message, &target);
                        }
                    }),
                );
            }
            Reaction::CloseChannel(name) => {
                if let Err(e) = self.close_channel(&name, false) {
                    tracing::debug!(
                        source = "ChannelRegistry.on_internal_message",
                        channel = %name,
                        error = %e,
                        "Remote close ignored"
                    );
                }
            }
        }
    }

    fn jitter(&self) -> Duration {
        let min = self.config.ping_delay_min_ms;
        let max = self.config.ping_delay_max_ms;
        if max <= min {
            return Duration::from_millis(min);
        }
        Duration::from_millis(rand::thread_rng().gen_range(min..max))
    }

    fn close_channel(self: &Arc<Self>, name: &str, notify: bool) -> RegistryResult<()> {
        let channel = {
            let state = self.lock();
            if state.phase != Phase::Running {
                return Err(RegistryError::NotRunning);
            }
            state
                .channels
                .iter()
                .find(|c| c.name() == name)
                .cloned()
                .ok_or_else(|| RegistryError::ChannelNotFound(name.to_string()))?
        };

        if notify {
            self.internal_broadcast(CLOSING_CHANNEL, name, TARGET_ALL);
            let notice = MessageEnvelope::new(ADMIN, CLOSING_NOTICE, self.caps.clock.as_ref()).on_channel(name);
            if let Err(e) = channel.broadcast(notice) {
                tracing::warn!(source = "ChannelRegistry.close_channel", channel = %name, error = %e, "Close notice not sent");
            }
        }

        let weak = Arc::downgrade(self);
        self.caps.scheduler.schedule(
            self.config.close_grace(),
            Box::new(move || {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                channel.close();
                inner.lock().channels.retain(|c| !Arc::ptr_eq(c, &channel));
                tracing::info!(
                    source = "ChannelRegistry.close_channel",
                    "Channel #{} has been closed!",
                    channel.name()
                );
            }),
        );
        Ok(())
    }
}
