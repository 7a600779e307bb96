//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Registry, channels, interception hook produce:
//!     → tracing events (structured fields, `source` = emitting operation)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → logging.rs subscriber installed by the host (stdout)
//!     → Prometheus scrape endpoint (optional, host binary only)
//! ```
//!
//! # Design Decisions
//! - The library only emits; installing a subscriber or recorder is the
//!   host's call
//! - Metrics are cheap no-ops when no recorder is installed

pub mod logging;
pub mod metrics;
