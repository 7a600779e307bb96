//! Request observation through a real HTTP client and a mock backend.

mod common;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use common::{start_mock_backend, MockResponse};
use crosswire::config::CrosswireConfig;
use crosswire::intercept::{DispatchHandler, InterceptError, InterceptingClient, ReqwestTransport, RequestReport};
use crosswire::matching::{observable, PatternCatalog, RequestPattern};

fn client() -> InterceptingClient<ReqwestTransport> {
    let http = reqwest::Client::builder().no_proxy().build().unwrap();
    InterceptingClient::new(ReqwestTransport::with_client(http))
}

fn default_catalog() -> Arc<PatternCatalog> {
    Arc::new(PatternCatalog::new(CrosswireConfig::default().intercept.patterns))
}

type Observed = Arc<Mutex<Vec<(String, RequestReport)>>>;

fn observe(dispatcher: &Arc<DispatchHandler>, client: &InterceptingClient<ReqwestTransport>, catalog: Arc<PatternCatalog>) -> Observed {
    let observed: Observed = Arc::new(Mutex::new(Vec::new()));
    let sink = observed.clone();
    dispatcher
        .init(
            client,
            Some(observable(catalog, move |pattern: &RequestPattern, report: &RequestReport| {
                sink.lock().unwrap().push((pattern.name().to_string(), report.clone()));
            })),
        )
        .unwrap();
    observed
}

#[tokio::test]
async fn test_matching_request_is_observed() {
    let addr: SocketAddr = "127.0.0.1:28481".parse().unwrap();
    start_mock_backend(addr, MockResponse::ok("application/json", r#"{"id":"gen-1"}"#)).await;

    let client = client();
    let dispatcher = DispatchHandler::new();
    let observed = observe(&dispatcher, &client, default_catalog());

    let url = format!("http://{}/v1/generations", addr);
    let response = client.fetch("POST", &url, Some("{}".into())).await.unwrap();
    assert_eq!(response.status, 200);

    let observed = observed.lock().unwrap();
    assert_eq!(observed.len(), 1);
    let (pattern, report) = &observed[0];
    assert_eq!(pattern, "Generate");
    assert_eq!(report.url, url);
    assert_eq!(report.method, "POST");
    assert_eq!(report.status, 200);
    assert_eq!(report.content_type, "application/json");
    assert_eq!(report.body, r#"{"id":"gen-1"}"#);
}

#[tokio::test]
async fn test_non_matching_method_is_not_observed() {
    let addr: SocketAddr = "127.0.0.1:28482".parse().unwrap();
    start_mock_backend(addr, MockResponse::ok("application/json", "[]")).await;

    let client = client();
    let dispatcher = DispatchHandler::new();
    let observed = observe(&dispatcher, &client, default_catalog());

    client
        .fetch("GET", &format!("http://{}/v1/generations", addr), None)
        .await
        .unwrap();
    assert!(observed.lock().unwrap().is_empty());

    client
        .fetch("GET", &format!("http://{}/v1/generations?limit=10", addr), None)
        .await
        .unwrap();
    let observed = observed.lock().unwrap();
    assert_eq!(observed.len(), 1);
    assert_eq!(observed[0].0, "Limit");
}

#[tokio::test]
async fn test_preflight_reports_allowed_methods() {
    let addr: SocketAddr = "127.0.0.1:28483".parse().unwrap();
    start_mock_backend(
        addr,
        MockResponse {
            status: 200,
            headers: vec![("Access-Control-Allow-Methods", "GET, POST, OPTIONS")],
            body: "",
        },
    )
    .await;

    let client = client();
    let dispatcher = DispatchHandler::new();
    let reports = Arc::new(Mutex::new(Vec::new()));
    let sink = reports.clone();
    dispatcher
        .init(
            &client,
            Some(Arc::new(move |report: &RequestReport| {
                sink.lock().unwrap().push(report.clone());
            })),
        )
        .unwrap();

    client
        .fetch("OPTIONS", &format!("http://{}/v1/generations", addr), None)
        .await
        .unwrap();

    let reports = reports.lock().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].method, "OPTIONS");
    assert_eq!(reports[0].content_type, "GET, POST, OPTIONS");
}

#[tokio::test]
async fn test_patterns_swap_at_runtime() {
    let addr: SocketAddr = "127.0.0.1:28484".parse().unwrap();
    start_mock_backend(addr, MockResponse::ok("text/plain", "ok")).await;

    let client = client();
    let dispatcher = DispatchHandler::new();
    let catalog = default_catalog();
    let observed = observe(&dispatcher, &client, catalog.clone());

    let url = format!("http://{}/upload/avatar", addr);
    client.fetch("PUT", &url, Some("bytes".into())).await.unwrap();
    assert!(observed.lock().unwrap().is_empty());

    catalog.replace(vec![RequestPattern::parse("Upload", "*/upload/*", "put").unwrap()]);
    client.fetch("PUT", &url, Some("bytes".into())).await.unwrap();

    let observed = observed.lock().unwrap();
    assert_eq!(observed.len(), 1);
    assert_eq!(observed[0].0, "Upload");
}

#[tokio::test]
async fn test_unreachable_backend_is_not_reported() {
    let client = client();
    let dispatcher = DispatchHandler::new();
    let reports = Arc::new(Mutex::new(0usize));
    let sink = reports.clone();
    dispatcher
        .init(
            &client,
            Some(Arc::new(move |_: &RequestReport| {
                *sink.lock().unwrap() += 1;
            })),
        )
        .unwrap();

    let result = client.fetch("GET", "http://127.0.0.1:28489/v1/generations", None).await;
    assert!(matches!(result, Err(InterceptError::Transport(_))));
    assert_eq!(*reports.lock().unwrap(), 0);
}
