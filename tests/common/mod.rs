//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use secvest_bridge::config::{BridgeConfig, PanelConfig};

/// A request as seen by the mock panel.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: String,
}

/// Handle to a running mock panel.
pub struct MockPanel {
    pub addr: SocketAddr,
    connections: Arc<AtomicUsize>,
}

impl MockPanel {
    /// Number of TCP connections accepted so far.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Panel host string with an explicit http scheme.
    pub fn host(&self) -> String {
        format!("http://{}", self.addr)
    }
}

/// Start a programmable mock panel on an ephemeral port. `f` maps every
/// request to a status and JSON body.
pub async fn start_programmable_panel<F>(f: F) -> MockPanel
where
    F: Fn(&SeenRequest) -> (u16, String) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicUsize::new(0));
    let counter = connections.clone();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    counter.fetch_add(1, Ordering::SeqCst);
                    let f = f.clone();
                    tokio::spawn(async move {
                        serve_one(socket, |request| f(request)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    MockPanel { addr, connections }
}

async fn serve_one<F>(mut socket: TcpStream, f: F)
where
    F: Fn(&SeenRequest) -> (u16, String),
{
    let Some(request) = read_request(&mut socket).await else {
        return;
    };
    let (status, body) = f(&request);
    let status_text = match status {
        200 => "200 OK",
        401 => "401 Unauthorized",
        403 => "403 Forbidden",
        404 => "404 Not Found",
        409 => "409 Conflict",
        500 => "500 Internal Server Error",
        502 => "502 Bad Gateway",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    };

    let response_str = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status_text,
        body.len(),
        body
    );
    let _ = socket.write_all(response_str.as_bytes()).await;
    let _ = socket.shutdown().await;
    tokio::time::sleep(Duration::from_millis(10)).await;
}

async fn read_request(socket: &mut TcpStream) -> Option<SeenRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let head_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let mut content_length = 0;
    let mut authorization = None;
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            match name.trim().to_ascii_lowercase().as_str() {
                "content-length" => content_length = value.trim().parse().unwrap_or(0),
                "authorization" => authorization = Some(value.trim().to_string()),
                _ => {}
            }
        }
    }

    while buf.len() < head_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let end = buf.len().min(head_end + content_length);
    let body = String::from_utf8_lossy(&buf[head_end..end]).to_string();

    Some(SeenRequest {
        method,
        path,
        authorization,
        body,
    })
}

/// Configuration pointing at `host` with fast retries.
pub fn test_config(host: &str) -> BridgeConfig {
    let mut config = BridgeConfig {
        panel: PanelConfig {
            host: host.to_string(),
            username: "installer".to_string(),
            password: "secret".to_string(),
            user_code: "1234".to_string(),
            ..PanelConfig::default()
        },
        ..BridgeConfig::default()
    };
    config.retries.max_attempts = 3;
    config.retries.base_delay_ms = 10;
    config.retries.max_delay_ms = 50;
    config.retries.jitter_ms = 0;
    config.circuit_breaker.failure_threshold = 2;
    config.timeouts.connect_secs = 2;
    config.timeouts.request_secs = 5;
    config
}
