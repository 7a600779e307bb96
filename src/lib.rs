//! Crosswire: broadcast messaging between execution contexts, with
//! observation of outgoing HTTP traffic.

pub mod clock;
pub mod config;
pub mod intercept;
pub mod lifecycle;
pub mod matching;
pub mod messaging;
pub mod observability;
pub mod transport;

pub use config::CrosswireConfig;
pub use intercept::{DispatchHandler, InterceptingClient, RequestReport};
pub use lifecycle::Shutdown;
pub use matching::{PatternCatalog, RequestPattern};
pub use messaging::{Capabilities, ChannelRegistry, MessageEnvelope};
pub use transport::LocalBus;
