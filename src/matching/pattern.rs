//! Declarative request patterns.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::matching::wildcard;

/// Errors raised while building a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("Invalid pattern value: {0:?}")]
    InvalidPattern(String),

    #[error("Invalid method value: {0:?}")]
    InvalidMethod(String),
}

/// HTTP methods a pattern can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum HttpMethod {
    Get,
    Put,
    Head,
    Post,
    Patch,
    Delete,
    Options,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 7] = [
        HttpMethod::Get,
        HttpMethod::Put,
        HttpMethod::Head,
        HttpMethod::Post,
        HttpMethod::Patch,
        HttpMethod::Delete,
        HttpMethod::Options,
    ];

    /// Canonical upper-case name.
    pub fn name(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Head => "HEAD",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// Case-insensitive comparison against a raw method token.
    pub fn is_matching(&self, method: &str) -> bool {
        !method.is_empty() && method.eq_ignore_ascii_case(self.name())
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HttpMethod {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HttpMethod::ALL
            .into_iter()
            .find(|m| m.is_matching(s))
            .ok_or_else(|| PatternError::InvalidMethod(s.to_string()))
    }
}

impl TryFrom<String> for HttpMethod {
    type Error = PatternError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HttpMethod> for String {
    fn from(method: HttpMethod) -> Self {
        method.name().to_string()
    }
}

/// A named (url pattern, method) rule identifying an observable request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestPattern {
    name: String,
    url_pattern: String,
    method: HttpMethod,
}

impl RequestPattern {
    /// Build a pattern; the url pattern must be non-empty.
    pub fn new(
        name: impl Into<String>,
        url_pattern: impl Into<String>,
        method: HttpMethod,
    ) -> Result<Self, PatternError> {
        let url_pattern = url_pattern.into();
        if url_pattern.is_empty() {
            return Err(PatternError::InvalidPattern(url_pattern));
        }
        Ok(Self {
            name: name.into(),
            url_pattern,
            method,
        })
    }

    /// Build a pattern from a raw method token such as `"post"`.
    pub fn parse(
        name: impl Into<String>,
        url_pattern: impl Into<String>,
        method: &str,
    ) -> Result<Self, PatternError> {
        Self::new(name, url_pattern, method.parse()?)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url_pattern(&self) -> &str {
        &self.url_pattern
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Returns true if the method matches and the url matches the pattern.
    pub fn is_matching(&self, url: &str, method: &str) -> bool {
        self.method.is_matching(method) && wildcard::matches(&self.url_pattern, url)
    }
}
