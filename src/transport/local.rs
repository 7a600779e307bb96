//! In-process broadcast bus.
//!
//! Every execution context in the process opens endpoints on the same
//! [`LocalBus`]. Posts are queued; the queue is drained either explicitly
//! with [`LocalBus::deliver_pending`] or by the task started with
//! [`LocalBus::spawn_pump`].

use dashmap::DashMap;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;

use crate::transport::{BroadcastTransport, Endpoint, MessageCallback, MessageEvent, TransportError};

/// Receiving side of an endpoint, shared with the bus.
struct Slot {
    id: u64,
    open: AtomicBool,
    callback: RwLock<Option<MessageCallback>>,
}

struct Delivery {
    recipients: Vec<Arc<Slot>>,
    event: MessageEvent,
}

#[derive(Default)]
struct BusInner {
    next_id: AtomicU64,
    subscribers: DashMap<String, Vec<Arc<Slot>>>,
    queue: Mutex<VecDeque<Delivery>>,
    /// Held for a whole drain so only one caller delivers at a time.
    drain: Mutex<()>,
    wake: Notify,
}

/// In-process broadcast transport shared by all local contexts.
#[derive(Clone, Default)]
pub struct LocalBus {
    inner: Arc<BusInner>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open endpoints on `name`.
    pub fn endpoint_count(&self, name: &str) -> usize {
        self.inner.subscribers.get(name).map(|s| s.len()).unwrap_or(0)
    }

    /// Number of queued, undelivered posts.
    pub fn queued(&self) -> usize {
        self.inner.queue.lock().expect("bus queue mutex poisoned").len()
    }

    /// Drain the queue, including posts made by callbacks while draining.
    /// Returns the number of callback invocations.
    ///
    /// Concurrent callers are serialized, so deliveries keep post order. A
    /// second caller blocks until the first finishes; callbacks must not
    /// call this themselves.
    pub fn deliver_pending(&self) -> usize {
        let _drain = self.inner.drain.lock().expect("bus drain mutex poisoned");
        let mut delivered = 0;
        loop {
            let next = self
                .inner
                .queue
                .lock()
                .expect("bus queue mutex poisoned")
                .pop_front();
            let Some(delivery) = next else {
                return delivered;
            };

            for slot in &delivery.recipients {
                if !slot.open.load(Ordering::Acquire) {
                    continue;
                }
                let callback = slot
                    .callback
                    .read()
                    .expect("endpoint callback lock poisoned")
                    .clone();
                if let Some(callback) = callback {
                    callback(delivery.event.clone());
                    delivered += 1;
                }
            }
        }
    }

    /// Drain the queue in the background whenever something is posted,
    /// until `shutdown` fires.
    pub fn spawn_pump(&self, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        let bus = self.clone();
        tokio::spawn(async move {
            tracing::debug!("Local bus pump started");
            loop {
                tokio::select! {
                    _ = bus.inner.wake.notified() => {
                        bus.deliver_pending();
                    }
                    _ = shutdown.recv() => {
                        tracing::debug!("Local bus pump stopping");
                        break;
                    }
                }
            }
        })
    }

    fn detach(&self, name: &str, id: u64) {
        if let Some(mut slots) = self.inner.subscribers.get_mut(name) {
            slots.retain(|s| s.id != id);
        }
        self.inner.subscribers.remove_if(name, |_, slots| slots.is_empty());
    }
}

impl BroadcastTransport for LocalBus {
    fn open(&self, name: &str) -> Result<Box<dyn Endpoint>, TransportError> {
        if name.is_empty() {
            return Err(TransportError::InvalidName);
        }

        let slot = Arc::new(Slot {
            id: self.inner.next_id.fetch_add(1, Ordering::Relaxed),
            open: AtomicBool::new(true),
            callback: RwLock::new(None),
        });
        self.inner
            .subscribers
            .entry(name.to_string())
            .or_default()
            .push(slot.clone());

        tracing::trace!(channel = %name, endpoint = slot.id, "Endpoint opened");
        Ok(Box::new(LocalEndpoint {
            bus: self.clone(),
            name: name.to_string(),
            slot,
        }))
    }
}

/// Endpoint handed out by [`LocalBus`].
struct LocalEndpoint {
    bus: LocalBus,
    name: String,
    slot: Arc<Slot>,
}

impl Endpoint for LocalEndpoint {
    fn name(&self) -> &str {
        &self.name
    }

    fn post_message(&self, data: Value) -> Result<(), TransportError> {
        if !self.slot.open.load(Ordering::Acquire) {
            return Err(TransportError::Closed(self.name.clone()));
        }

        let recipients: Vec<Arc<Slot>> = self
            .bus
            .inner
            .subscribers
            .get(&self.name)
            .map(|slots| slots.iter().filter(|s| s.id != self.slot.id).cloned().collect())
            .unwrap_or_default();

        if !recipients.is_empty() {
            self.bus
                .inner
                .queue
                .lock()
                .expect("bus queue mutex poisoned")
                .push_back(Delivery {
                    recipients,
                    event: MessageEvent {
                        channel: self.name.clone(),
                        data,
                    },
                });
            self.bus.inner.wake.notify_one();
        }
        Ok(())
    }

    fn on_message(&self, callback: MessageCallback) {
        *self
            .slot
            .callback
            .write()
            .expect("endpoint callback lock poisoned") = Some(callback);
    }

    fn close(&self) {
        if self.slot.open.swap(false, Ordering::AcqRel) {
            self.bus.detach(&self.name, self.slot.id);
            tracing::trace!(channel = %self.name, endpoint = self.slot.id, "Endpoint closed");
        }
    }
}

impl Drop for LocalEndpoint {
    fn drop(&mut self) {
        self.close();
    }
}
