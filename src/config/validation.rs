//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (delay window ordered and non-zero)
//! - Detect empty and duplicate pattern definitions
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: CrosswireConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use thiserror::Error;

use crate::config::schema::CrosswireConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("broadcast.internal_channel must not be empty")]
    EmptyInternalChannel,

    #[error("broadcast ping delay window {min}..{max} ms is invalid")]
    InvalidPingWindow { min: u64, max: u64 },

    #[error("intercept.patterns[{0}] has an empty name")]
    EmptyPatternName(usize),

    #[error("pattern {0:?} has an empty url_pattern")]
    EmptyUrlPattern(String),

    #[error("pattern {0:?} is defined more than once")]
    DuplicatePattern(String),
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &CrosswireConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let broadcast = &config.broadcast;
    if broadcast.internal_channel.is_empty() {
        errors.push(ValidationError::EmptyInternalChannel);
    }
    if broadcast.ping_delay_max_ms == 0 || broadcast.ping_delay_min_ms > broadcast.ping_delay_max_ms {
        errors.push(ValidationError::InvalidPingWindow {
            min: broadcast.ping_delay_min_ms,
            max: broadcast.ping_delay_max_ms,
        });
    }

    let mut names = HashSet::new();
    for (i, pattern) in config.intercept.patterns.iter().enumerate() {
        if pattern.name().is_empty() {
            errors.push(ValidationError::EmptyPatternName(i));
        } else if !names.insert(pattern.name()) {
            errors.push(ValidationError::DuplicatePattern(pattern.name().to_string()));
        }
        if pattern.url_pattern().is_empty() {
            errors.push(ValidationError::EmptyUrlPattern(pattern.name().to_string()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
