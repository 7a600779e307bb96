//! HTTP client with an interception point.
//!
//! # Responsibilities
//! - Record method and url when a request is opened
//! - Execute the request through a pluggable transport
//! - Notify the installed interceptor at open and on completion
//!
//! # Design Decisions
//! - Request ID (UUID v4) assigned at open, carried into every report
//! - The interceptor slot is set-once; a second install fails instead
//!   of stacking or replacing hooks

use std::future::Future;
use std::sync::{Arc, OnceLock};
use url::Url;
use uuid::Uuid;

use crate::intercept::types::{CompletedResponse, InterceptError};

/// A request recorded at open time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    pub id: Uuid,
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// Executes requests on the wire.
pub trait HttpTransport: Send + Sync {
    fn execute(
        &self,
        request: &OutboundRequest,
    ) -> impl Future<Output = Result<CompletedResponse, InterceptError>> + Send;
}

/// Observer of the request lifecycle.
pub trait Interceptor: Send + Sync {
    /// Called when a request is opened, before anything is sent.
    fn on_open(&self, _request: &OutboundRequest) {}

    /// Called once a response has been fully received.
    fn on_complete(&self, request: &OutboundRequest, response: &CompletedResponse);
}

/// HTTP client the host constructs and hands to the interception layer.
pub struct InterceptingClient<T> {
    transport: T,
    interceptor: OnceLock<Arc<dyn Interceptor>>,
}

impl<T: HttpTransport> InterceptingClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            interceptor: OnceLock::new(),
        }
    }

    /// Install the interceptor. Only one may ever be installed.
    pub fn install(&self, interceptor: Arc<dyn Interceptor>) -> Result<(), InterceptError> {
        self.interceptor
            .set(interceptor)
            .map_err(|_| InterceptError::AlreadyInstalled)
    }

    pub fn is_intercepted(&self) -> bool {
        self.interceptor.get().is_some()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Start a request.
    pub fn open(&self, method: &str, url: &str) -> Result<PendingRequest<'_, T>, InterceptError> {
        if method.is_empty() || !method.bytes().all(|b| b.is_ascii_alphabetic()) {
            return Err(InterceptError::InvalidMethod(method.to_string()));
        }
        Url::parse(url).map_err(|e| InterceptError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let request = OutboundRequest {
            id: Uuid::new_v4(),
            method: method.to_string(),
            url: url.to_string(),
            headers: Vec::new(),
            body: None,
        };

        tracing::trace!(request_id = %request.id, method = %method, url = %url, "Request opened");
        if let Some(interceptor) = self.interceptor.get() {
            interceptor.on_open(&request);
        }

        Ok(PendingRequest {
            client: self,
            request,
        })
    }

    /// Open and send in one step.
    pub async fn fetch(
        &self,
        method: &str,
        url: &str,
        body: Option<String>,
    ) -> Result<CompletedResponse, InterceptError> {
        self.open(method, url)?.send(body).await
    }
}

/// An opened request waiting to be sent.
pub struct PendingRequest<'a, T> {
    client: &'a InterceptingClient<T>,
    request: OutboundRequest,
}

impl<'a, T: HttpTransport> PendingRequest<'a, T> {
    pub fn id(&self) -> Uuid {
        self.request.id
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request.headers.push((name.into(), value.into()));
        self
    }

    /// Send the request and report the completed response.
    pub async fn send(mut self, body: Option<String>) -> Result<CompletedResponse, InterceptError> {
        self.request.body = body;

        let response = self
            .client
            .transport
            .execute(&self.request)
            .await
            .inspect_err(|e| {
                tracing::warn!(request_id = %self.request.id, url = %self.request.url, error = %e, "Request failed");
            })?;

        tracing::debug!(
            request_id = %self.request.id,
            method = %self.request.method,
            url = %self.request.url,
            status = response.status,
            "Request completed"
        );
        if let Some(interceptor) = self.client.interceptor.get() {
            interceptor.on_complete(&self.request, &response);
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Canned;

    impl HttpTransport for Canned {
        async fn execute(&self, request: &OutboundRequest) -> Result<CompletedResponse, InterceptError> {
            if request.url.contains("fail") {
                return Err(InterceptError::Transport("connection refused".into()));
            }
            Ok(CompletedResponse {
                status: 200,
                headers: vec![],
                body: request.body.clone().unwrap_or_default(),
            })
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl Interceptor for Recorder {
        fn on_open(&self, request: &OutboundRequest) {
            self.events.lock().unwrap().push(format!("open {} {}", request.method, request.url));
        }

        fn on_complete(&self, request: &OutboundRequest, response: &CompletedResponse) {
            self.events
                .lock()
                .unwrap()
                .push(format!("done {} {}", request.method, response.body));
        }
    }

    #[tokio::test]
    async fn test_lifecycle_is_reported() {
        let client = InterceptingClient::new(Canned);
        let recorder = Arc::new(Recorder::default());
        client.install(recorder.clone()).unwrap();

        let response = client
            .fetch("POST", "https://host/v1/generations", Some("payload".into()))
            .await
            .unwrap();
        assert_eq!(response.body, "payload");
        assert_eq!(
            *recorder.events.lock().unwrap(),
            vec!["open POST https://host/v1/generations", "done POST payload"]
        );
    }

    #[tokio::test]
    async fn test_failed_request_not_completed() {
        let client = InterceptingClient::new(Canned);
        let recorder = Arc::new(Recorder::default());
        client.install(recorder.clone()).unwrap();

        assert!(client.fetch("GET", "https://host/fail", None).await.is_err());
        assert_eq!(recorder.events.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_single_interceptor() {
        let client = InterceptingClient::new(Canned);
        assert!(!client.is_intercepted());
        client.install(Arc::new(Recorder::default())).unwrap();
        assert_eq!(
            client.install(Arc::new(Recorder::default())),
            Err(InterceptError::AlreadyInstalled)
        );
        assert!(client.is_intercepted());
    }

    #[test]
    fn test_open_validates_input() {
        let client = InterceptingClient::new(Canned);
        assert!(matches!(client.open("", "https://host/"), Err(InterceptError::InvalidMethod(_))));
        assert!(matches!(client.open("G T", "https://host/"), Err(InterceptError::InvalidMethod(_))));
        assert!(matches!(client.open("GET", "not a url"), Err(InterceptError::InvalidUrl { .. })));
        assert!(client.open("get", "https://host/").is_ok());
    }
}
