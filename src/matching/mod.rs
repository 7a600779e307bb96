//! Request pattern matching subsystem.
//!
//! # Data Flow
//! ```text
//! Pattern definitions (config [intercept].patterns):
//!     → pattern.rs (RequestPattern: name + url pattern + HttpMethod)
//!     → catalog.rs (PatternCatalog, swapped atomically on reload)
//!
//! Completed request (url, method):
//!     → catalog.rs (first pattern whose method and url match)
//!     → wildcard.rs (lenient `*` matcher on the url)
//!     → Return: matched RequestPattern or None
//! ```
//!
//! # Design Decisions
//! - No regex: fragments are checked with prefix/suffix/containment only
//! - Fragment order is NOT enforced; callers depend on that leniency
//! - Method comparison is case-insensitive, url comparison is not
//! - First match wins, in configuration order

pub mod catalog;
pub mod pattern;
pub mod wildcard;

pub use catalog::{observable, PatternCatalog};
pub use pattern::{HttpMethod, PatternError, RequestPattern};
pub use wildcard::matches;
