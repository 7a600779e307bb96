//! Dispatch of intercepted requests to a single consumer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use crate::intercept::client::{HttpTransport, InterceptingClient};
use crate::intercept::hook::InterceptionHook;
use crate::intercept::types::{InterceptError, RequestReport};

/// Downstream receiver of request reports.
pub type Consumer = Arc<dyn Fn(&RequestReport) + Send + Sync>;

/// Forwards every report from the hook to one consumer.
///
/// The consumer is bound once, either at `init` or later through
/// `apply_handler`; reports arriving before that are dropped.
#[derive(Default)]
pub struct DispatchHandler {
    consumer: OnceLock<Consumer>,
    initialized: AtomicBool,
}

impl DispatchHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn has_handler(&self) -> bool {
        self.consumer.get().is_some()
    }

    /// Hook `client` and, optionally, bind the consumer.
    pub fn init<T: HttpTransport>(
        self: &Arc<Self>,
        client: &InterceptingClient<T>,
        consumer: Option<Consumer>,
    ) -> Result<(), InterceptError> {
        if self.initialized.swap(true, Ordering::AcqRel) {
            tracing::warn!(source = "DispatchHandler.init", "Already initialized!");
            return Err(InterceptError::AlreadyInitialized);
        }
        if consumer.is_some() && self.has_handler() {
            self.initialized.store(false, Ordering::Release);
            tracing::warn!(source = "DispatchHandler.init", "Already handled!");
            return Err(InterceptError::AlreadyHandled);
        }

        let dispatcher = Arc::downgrade(self);
        let hook = InterceptionHook::new(Arc::new(move |report: RequestReport| {
            if let Some(dispatcher) = dispatcher.upgrade() {
                dispatcher.handle(&report);
            }
        }));
        if let Err(e) = hook.install(client) {
            self.initialized.store(false, Ordering::Release);
            return Err(e);
        }

        if let Some(consumer) = consumer {
            self.apply_handler(consumer)?;
        }
        tracing::info!(source = "DispatchHandler.init", handled = self.has_handler(), "Init complete.");
        Ok(())
    }

    /// Bind the consumer. Fails if one is already bound.
    pub fn apply_handler(&self, consumer: Consumer) -> Result<(), InterceptError> {
        match self.consumer.set(consumer) {
            Ok(()) => {
                tracing::info!(source = "DispatchHandler.apply_handler", "Handler applied.");
                Ok(())
            }
            Err(_) => {
                tracing::warn!(source = "DispatchHandler.apply_handler", "Already handled!");
                Err(InterceptError::AlreadyHandled)
            }
        }
    }

    /// Forward a report to the consumer, if any.
    pub fn handle(&self, report: &RequestReport) {
        if let Some(consumer) = self.consumer.get() {
            consumer(report);
        }
    }
}
