//! `HttpTransport` backed by reqwest.

use reqwest::Method;

use crate::intercept::client::{HttpTransport, OutboundRequest};
use crate::intercept::types::{CompletedResponse, InterceptError};

/// Production transport. Cheap to clone; clones share a connection pool.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: &OutboundRequest) -> Result<CompletedResponse, InterceptError> {
        let method = Method::from_bytes(request.method.to_uppercase().as_bytes())
            .map_err(|_| InterceptError::InvalidMethod(request.method.clone()))?;

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| InterceptError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| InterceptError::Transport(e.to_string()))?;

        Ok(CompletedResponse { status, headers, body })
    }
}
