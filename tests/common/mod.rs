//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crosswire::clock::{SequentialIds, SystemClock};
use crosswire::config::BroadcastConfig;
use crosswire::lifecycle::ManualScheduler;
use crosswire::messaging::{Capabilities, ChannelRegistry, Handler};
use crosswire::transport::{LocalBus, MessageEvent};

/// A canned HTTP response.
#[derive(Clone)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(&'static str, &'static str)>,
    pub body: &'static str,
}

impl MockResponse {
    pub fn ok(content_type: &'static str, body: &'static str) -> Self {
        Self {
            status: 200,
            headers: vec![("Content-Type", content_type)],
            body,
        }
    }
}

/// Start a mock backend answering every request with `response`.
pub async fn start_mock_backend(addr: SocketAddr, response: MockResponse) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let response = response.clone();
                    tokio::spawn(async move {
                        let _ = answer(socket, &response).await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}

async fn answer(mut socket: TcpStream, response: &MockResponse) -> std::io::Result<()> {
    read_request(&mut socket).await?;

    let status_text = match response.status {
        200 => "200 OK",
        204 => "204 No Content",
        404 => "404 Not Found",
        500 => "500 Internal Server Error",
        _ => "200 OK",
    };
    let mut head = format!("HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n", status_text, response.body.len());
    for (name, value) in &response.headers {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    head.push_str("\r\n");

    socket.write_all(head.as_bytes()).await?;
    socket.write_all(response.body.as_bytes()).await?;
    socket.shutdown().await?;
    tokio::time::sleep(Duration::from_millis(10)).await;
    Ok(())
}

/// Consume the request head and body so closing the socket does not reset it.
async fn read_request(socket: &mut TcpStream) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(end) = find_head_end(&buf) {
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            let mut remaining = (end + 4 + length).saturating_sub(buf.len());
            while remaining > 0 {
                let n = socket.read(&mut chunk).await?;
                if n == 0 {
                    break;
                }
                remaining = remaining.saturating_sub(n);
            }
            return Ok(());
        }
    }
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Registry on a shared bus, driven by a virtual-time scheduler.
pub fn registry(bus: &LocalBus, scheduler: &Arc<ManualScheduler>, prefix: &str) -> ChannelRegistry {
    registry_with(bus, scheduler, prefix, BroadcastConfig::default())
}

pub fn registry_with(
    bus: &LocalBus,
    scheduler: &Arc<ManualScheduler>,
    prefix: &str,
    config: BroadcastConfig,
) -> ChannelRegistry {
    ChannelRegistry::new(
        config,
        Capabilities {
            transport: Arc::new(bus.clone()),
            scheduler: scheduler.clone(),
            clock: Arc::new(SystemClock),
            ids: Arc::new(SequentialIds::new(prefix)),
        },
    )
}

/// Handler recording every event it sees.
pub fn recorder() -> (Handler, Arc<Mutex<Vec<MessageEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let handler: Handler = Arc::new(move |event: &MessageEvent| {
        sink.lock().unwrap().push(event.clone());
    });
    (handler, events)
}
