//! Interception hook.
//!
//! Turns request lifecycle callbacks into [`RequestReport`]s for a sink.
//! Responses without a content type (CORS preflights, mostly) report their
//! `access-control-allow-methods` header in its place.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::intercept::client::{HttpTransport, InterceptingClient, Interceptor, OutboundRequest};
use crate::intercept::types::{CompletedResponse, InterceptError, RequestReport};

/// Placeholder when a response carries neither header.
pub const UNKNOWN_CONTENT_TYPE: &str = "N/A";

/// Receives one report per completed request.
pub type ReportSink = Arc<dyn Fn(RequestReport) + Send + Sync>;

/// Interceptor that reports every completed request to a sink.
pub struct InterceptionHook {
    sink: ReportSink,
    installed: AtomicBool,
}

impl InterceptionHook {
    pub fn new(sink: ReportSink) -> Arc<Self> {
        Arc::new(Self {
            sink,
            installed: AtomicBool::new(false),
        })
    }

    pub fn is_installed(&self) -> bool {
        self.installed.load(Ordering::Acquire)
    }

    /// Install on a client. A hook installs once, and a client accepts one hook.
    pub fn install<T: HttpTransport>(self: &Arc<Self>, client: &InterceptingClient<T>) -> Result<(), InterceptError> {
        if self.installed.swap(true, Ordering::AcqRel) {
            tracing::warn!(source = "InterceptionHook.install", "Already initiated!");
            return Err(InterceptError::AlreadyInitialized);
        }
        if let Err(e) = client.install(self.clone()) {
            self.installed.store(false, Ordering::Release);
            tracing::warn!(source = "InterceptionHook.install", error = %e, "Hook not installed");
            return Err(e);
        }
        tracing::info!(source = "InterceptionHook.install", "Init complete.");
        Ok(())
    }
}

/// Content type to report for a response.
pub fn report_content_type(response: &CompletedResponse) -> String {
    response
        .header("content-type")
        .or_else(|| response.header("access-control-allow-methods"))
        .unwrap_or(UNKNOWN_CONTENT_TYPE)
        .to_string()
}

impl Interceptor for InterceptionHook {
    fn on_open(&self, request: &OutboundRequest) {
        tracing::trace!(request_id = %request.id, method = %request.method, url = %request.url, "Tracking request");
    }

    fn on_complete(&self, request: &OutboundRequest, response: &CompletedResponse) {
        (self.sink)(RequestReport {
            request_id: request.id,
            url: request.url.clone(),
            method: request.method.clone(),
            status: response.status,
            content_type: report_content_type(response),
            body: response.body.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Stub(CompletedResponse);

    impl HttpTransport for Stub {
        async fn execute(&self, _request: &OutboundRequest) -> Result<CompletedResponse, InterceptError> {
            Ok(self.0.clone())
        }
    }

    fn response(headers: &[(&str, &str)], body: &str) -> CompletedResponse {
        CompletedResponse {
            status: 200,
            headers: headers.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_content_type_fallbacks() {
        assert_eq!(
            report_content_type(&response(&[("Content-Type", "text/plain")], "")),
            "text/plain"
        );
        assert_eq!(
            report_content_type(&response(&[("Access-Control-Allow-Methods", "GET, POST")], "")),
            "GET, POST"
        );
        assert_eq!(report_content_type(&response(&[], "")), UNKNOWN_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn test_reports_completed_request() {
        let client = InterceptingClient::new(Stub(response(&[("content-type", "application/json")], "{}")));
        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink = reports.clone();
        let hook = InterceptionHook::new(Arc::new(move |report: RequestReport| {
            sink.lock().unwrap().push(report);
        }));
        hook.install(&client).unwrap();

        client.fetch("POST", "https://host/v1/generations", None).await.unwrap();

        let reports = reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].url, "https://host/v1/generations");
        assert_eq!(reports[0].method, "POST");
        assert_eq!(reports[0].content_type, "application/json");
        assert_eq!(reports[0].body, "{}");
    }

    #[test]
    fn test_install_once() {
        let first = InterceptingClient::new(Stub(CompletedResponse::default()));
        let second = InterceptingClient::new(Stub(CompletedResponse::default()));
        let hook = InterceptionHook::new(Arc::new(|_: RequestReport| {}));

        hook.install(&first).unwrap();
        assert_eq!(hook.install(&second), Err(InterceptError::AlreadyInitialized));
        assert!(!second.is_intercepted());

        let other = InterceptionHook::new(Arc::new(|_: RequestReport| {}));
        assert_eq!(other.install(&first), Err(InterceptError::AlreadyInstalled));
        assert!(!other.is_installed());
    }
}
