//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Deferred work (scheduler.rs):
//!     registry schedules jittered pings / close grace periods
//!     → TokioScheduler: spawned sleep, then run task
//!     → ManualScheduler: queued until virtual time is advanced
//!
//! Teardown (shutdown.rs):
//!     host triggers Shutdown → pending tokio tasks are abandoned
//!                            → LocalBus pump exits
//! ```
//!
//! # Design Decisions
//! - No cancellation per task: once scheduled, a task fires unless the
//!   whole process state is torn down
//! - Tasks never run while the scheduler holds a lock

pub mod scheduler;
pub mod shutdown;

pub use scheduler::{ManualScheduler, Scheduler, Task, TokioScheduler};
pub use shutdown::Shutdown;
