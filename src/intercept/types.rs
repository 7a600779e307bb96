//! Interception data types and errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by the interception pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InterceptError {
    #[error("Already initialized!")]
    AlreadyInitialized,

    #[error("Already handled!")]
    AlreadyHandled,

    #[error("Client already has an interceptor installed")]
    AlreadyInstalled,

    #[error("Invalid method: {0:?}")]
    InvalidMethod(String),

    #[error("Invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Transport error: {0}")]
    Transport(String),
}

/// A response as seen by interceptors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl CompletedResponse {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// What the dispatcher hands to its consumer for each completed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestReport {
    pub request_id: Uuid,
    pub url: String,
    pub method: String,
    pub status: u16,
    pub content_type: String,
    pub body: String,
}
