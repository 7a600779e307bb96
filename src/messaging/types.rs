//! Messaging error definitions.

use thiserror::Error;

use crate::transport::TransportError;

/// Errors raised by a single channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("Invalid channel name")]
    InvalidName,

    #[error("Channel #{0} already has a handler")]
    HandlerAlreadyBound(String),

    #[error("Channel #{0} is closed")]
    Closed(String),

    #[error("Nothing to broadcast")]
    EmptyPayload,

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Errors raised by the channel registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Registry already initialized")]
    AlreadyInitialized,

    #[error("Registry not running")]
    NotRunning,

    #[error("Invalid channel name")]
    InvalidName,

    #[error("Channel #{0} is reserved for control traffic")]
    ReservedName(String),

    #[error("Channel #{0} already exists!")]
    ChannelExists(String),

    #[error("Channel #{0} not found")]
    ChannelNotFound(String),

    #[error(transparent)]
    Channel(#[from] ChannelError),
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RegistryError::ChannelExists("alpha".into());
        assert_eq!(err.to_string(), "Channel #alpha already exists!");

        let err = RegistryError::from(ChannelError::Closed("beta".into()));
        assert_eq!(err.to_string(), "Channel #beta is closed");

        let err = ChannelError::from(TransportError::InvalidName);
        assert!(err.to_string().contains("Invalid channel name"));
    }
}
