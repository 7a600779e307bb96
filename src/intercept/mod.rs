//! HTTP request interception subsystem.
//!
//! # Data Flow
//! ```text
//! Host code
//!     → client.rs open(method, url)   → interceptor.on_open (request recorded)
//!     → client.rs send(body)          → HttpTransport (reqwest_transport.rs in production)
//!     → completed response            → interceptor.on_complete
//!     → hook.rs (content type / allow-methods fallback, build RequestReport)
//!     → dispatch.rs (single bound consumer)
//!     → consumer (optionally filtered through PatternCatalog)
//! ```
//!
//! # Design Decisions
//! - Interception is an explicit registration point on a client the host
//!   constructs; nothing global is patched
//! - One interceptor per client, one consumer per dispatcher, set once
//! - Every completed request is reported; pattern filtering belongs to
//!   the consumer
//! - Failed requests (no response) are not reported

pub mod client;
pub mod dispatch;
pub mod hook;
pub mod reqwest_transport;
pub mod types;

pub use client::{HttpTransport, InterceptingClient, Interceptor, OutboundRequest, PendingRequest};
pub use dispatch::{Consumer, DispatchHandler};
pub use hook::InterceptionHook;
pub use reqwest_transport::ReqwestTransport;
pub use types::{CompletedResponse, InterceptError, RequestReport};
