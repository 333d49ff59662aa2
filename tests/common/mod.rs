//! In-process mock servers for integration tests.
//!
//! `MockHttp` answers canned responses per route and records every request;
//! `MockDashboard` accepts WebSocket connections on `/admin_dashboard` and
//! plays a script of frames to each one.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::SinkExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message as WsMessage;

use dynamo_console::{Console, ConsoleConfig, Notification, NotificationKind};

// ---------------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("request body is not JSON")
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, Clone)]
pub struct Route {
    pub method: &'static str,
    pub path: &'static str,
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl Route {
    pub fn new(method: &'static str, path: &'static str, status: u16, body: impl Into<String>) -> Self {
        Self {
            method,
            path,
            status,
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

pub struct MockHttp {
    pub origin: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockHttp {
    pub async fn start(routes: Vec<Route>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let routes = Arc::new(routes);

        let recorded = Arc::clone(&requests);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else { return };
                let routes = Arc::clone(&routes);
                let recorded = Arc::clone(&recorded);
                tokio::spawn(async move {
                    let _ = serve_one(stream, &routes, &recorded).await;
                });
            }
        });

        Self {
            origin: format!("http://{addr}"),
            requests,
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }
}

async fn serve_one(
    mut stream: TcpStream,
    routes: &[Route],
    recorded: &Mutex<Vec<RecordedRequest>>,
) -> std::io::Result<()> {
    let mut buf = Vec::with_capacity(4096);
    let mut chunk = [0u8; 4096];

    // Read until the header block is complete.
    let (header_len, method, path, headers) = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);

        let mut parsed = [httparse::EMPTY_HEADER; 64];
        let mut req = httparse::Request::new(&mut parsed);
        if let Ok(httparse::Status::Complete(len)) = req.parse(&buf) {
            let headers: HashMap<String, String> = req
                .headers
                .iter()
                .map(|h| {
                    (
                        h.name.to_ascii_lowercase(),
                        String::from_utf8_lossy(h.value).into_owned(),
                    )
                })
                .collect();
            break (
                len,
                req.method.unwrap_or("").to_string(),
                req.path.unwrap_or("").to_string(),
                headers,
            );
        }
    };

    let mut body = buf[header_len..].to_vec();
    if let Some(len) = headers.get("content-length").and_then(|v| v.parse::<usize>().ok()) {
        while body.len() < len {
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..n]);
        }
    } else if headers
        .get("transfer-encoding")
        .is_some_and(|v| v.eq_ignore_ascii_case("chunked"))
    {
        while !body.ends_with(b"0\r\n\r\n") {
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..n]);
        }
        body = dechunk(&body);
    }

    recorded.lock().unwrap().push(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        headers,
        body,
    });

    let (status, reply, delay) = match routes
        .iter()
        .find(|r| r.method == method && r.path == path)
    {
        Some(r) => (r.status, r.body.clone(), r.delay),
        None => (404, r#"{"detail":"Not Found"}"#.to_string(), Duration::ZERO),
    };
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let response = format!(
        "HTTP/1.1 {status} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        reason(status),
        reply.len(),
        reply,
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

fn dechunk(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut rest = raw;
    loop {
        let Some(pos) = rest.windows(2).position(|w| w == b"\r\n") else { break };
        let size = usize::from_str_radix(String::from_utf8_lossy(&rest[..pos]).trim(), 16).unwrap_or(0);
        if size == 0 {
            break;
        }
        let start = pos + 2;
        out.extend_from_slice(&rest[start..start + size]);
        rest = &rest[start + size + 2..];
    }
    out
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    }
}

// ---------------------------------------------------------------------------
// WebSocket dashboard
// ---------------------------------------------------------------------------

/// What the dashboard does with one accepted connection.
#[derive(Debug, Clone)]
pub enum Script {
    /// Send the frames, then close.
    SendThenClose(Vec<String>),
    /// Send the frames, then keep the connection open.
    SendThenHold(Vec<String>),
    /// Send the frames as binary messages, then keep the connection open.
    SendBinaryThenHold(Vec<String>),
}

pub struct MockDashboard {
    pub origin: String,
    accepted: Arc<AtomicUsize>,
}

impl MockDashboard {
    /// Connection `n` plays `scripts[n]`; connections past the end replay the
    /// last script.
    pub async fn start(scripts: Vec<Script>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&accepted);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else { return };
                let n = counter.fetch_add(1, Ordering::SeqCst);
                let script = scripts
                    .get(n)
                    .or_else(|| scripts.last())
                    .cloned()
                    .unwrap_or(Script::SendThenHold(Vec::new()));
                tokio::spawn(async move {
                    let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else { return };
                    let (frames, hold): (Vec<WsMessage>, bool) = match script {
                        Script::SendThenClose(f) => (f.into_iter().map(WsMessage::Text).collect(), false),
                        Script::SendThenHold(f) => (f.into_iter().map(WsMessage::Text).collect(), true),
                        Script::SendBinaryThenHold(f) => (
                            f.into_iter().map(|t| WsMessage::Binary(t.into_bytes())).collect(),
                            true,
                        ),
                    };
                    for frame in frames {
                        if ws.send(frame).await.is_err() {
                            return;
                        }
                    }
                    if hold {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                    } else {
                        let _ = ws.close(None).await;
                    }
                });
            }
        });

        Self {
            origin: format!("http://{addr}"),
            accepted,
        }
    }

    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Console helpers
// ---------------------------------------------------------------------------

pub fn test_config(origin: &str) -> ConsoleConfig {
    ConsoleConfig {
        origin: origin.to_string(),
        reconnect_delay_ms: 200,
        toast_ttl_ms: 10_000,
        redirect_delay_ms: 50,
        connect_timeout_ms: 1_000,
        request_timeout_ms: 5_000,
        echo: false,
        ..Default::default()
    }
}

pub fn console_for(origin: &str) -> Console {
    Console::new(test_config(origin)).unwrap()
}

/// An origin nothing is listening on.
pub async fn dead_origin() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

pub fn messages(console: &Console, kind: NotificationKind) -> Vec<String> {
    console
        .toaster()
        .banners()
        .into_iter()
        .filter(|b| b.kind == kind)
        .map(|b| b.message)
        .collect()
}

/// Wait for a banner matching `pred` on `rx`, up to `within`.
pub async fn wait_for_banner(
    rx: &mut tokio::sync::broadcast::Receiver<Notification>,
    within: Duration,
    pred: impl Fn(&Notification) -> bool,
) -> Option<Notification> {
    tokio::time::timeout(within, async {
        loop {
            match rx.recv().await {
                Ok(n) if pred(&n) => return Some(n),
                Ok(_) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    })
    .await
    .ok()
    .flatten()
}

/// Poll `cond` every 10ms until it holds or `within` elapses.
pub async fn eventually(within: Duration, cond: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + within;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}
