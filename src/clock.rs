//! Time and identifier capabilities.
//!
//! Envelopes are stamped through [`Clock`] and peers are named through
//! [`IdGenerator`], so tests can swap both for deterministic versions.

use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Source of human-readable timestamps.
pub trait Clock: Send + Sync {
    /// Current wall-clock time, formatted for envelopes and logs.
    fn current_time(&self) -> String;
}

/// Source of peer identifiers.
pub trait IdGenerator: Send + Sync {
    /// A fresh identifier, unique for all practical purposes.
    fn random_id(&self) -> String;
}

/// Local wall clock formatted as `HH:MM:SS`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn current_time(&self) -> String {
        chrono::Local::now().format("%H:%M:%S").to_string()
    }
}

/// Random UUID v4 identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn random_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Predictable identifiers (`<prefix>-1`, `<prefix>-2`, ...).
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn random_id(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.prefix, n)
    }
}
