//! # Live ring status
//!
//! [`StatusSync`] owns the dashboard WebSocket and its reconnect timer. The
//! server pushes `{ "virtual_nodes": [...], "physical_nodes": [...] }` frames
//! at its own cadence; each decodable frame is rendered into the page's two
//! status slots. The client never sends anything.
//!
//! ## Lifecycle
//! `Connecting -> Open` on handshake, `Open -> Closed` on close or socket
//! error, `Closed -> Connecting` after the reconnect delay. Retries are
//! unconditional and unbounded until [`StatusSync::stop`].
//!
//! ## Guarantees
//! - At most one channel task exists; opening a new one aborts the previous.
//! - At most one reconnect timer is pending; scheduling a new one aborts any
//!   prior timer, so repeated close events cannot stack attempts.
//! - Undecodable frames raise an error notification and are dropped; they
//!   never close the channel.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use reqwest::Url;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tracing::{debug, info, warn};

use crate::error::{ConsoleError, Result};
use crate::notify::{NotificationKind, Toaster};
use crate::page::Page;

/// Path of the dashboard WebSocket on the origin.
pub const DASHBOARD_PATH: &str = "/admin_dashboard";

pub const VIRTUAL_NODES_FALLBACK: &str = "No virtual nodes";
pub const PHYSICAL_NODES_FALLBACK: &str = "No physical nodes";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Open => write!(f, "open"),
            ConnectionState::Closed => write!(f, "closed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

/// One decoded status frame. A field is `None` when the server sent anything
/// other than an array for it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusPayload {
    pub virtual_nodes: Option<Vec<String>>,
    pub physical_nodes: Option<Vec<String>>,
}

impl StatusPayload {
    /// Decode a text frame. Only malformed JSON is an error; a well-formed
    /// document of the wrong shape yields empty fields.
    pub fn decode(frame: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(frame).map_err(|e| ConsoleError::decode("status frame", e))?;
        Ok(Self::from_value(&value))
    }

    pub fn from_value(value: &Value) -> Self {
        let list = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_array)
                .map(|items| items.iter().map(element_text).collect())
        };
        Self {
            virtual_nodes: list("virtual_nodes"),
            physical_nodes: list("physical_nodes"),
        }
    }

    pub fn virtual_text(&self) -> String {
        render_list(self.virtual_nodes.as_deref(), VIRTUAL_NODES_FALLBACK)
    }

    pub fn physical_text(&self) -> String {
        render_list(self.physical_nodes.as_deref(), PHYSICAL_NODES_FALLBACK)
    }
}

/// Join with ", ", or the fallback when the field was not an array.
/// An empty array renders as an empty string.
pub fn render_list(items: Option<&[String]>, fallback: &str) -> String {
    match items {
        Some(items) => items.join(", "),
        None => fallback.to_string(),
    }
}

// Strings verbatim, null as empty, anything else as its JSON text.
fn element_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Derive the dashboard socket URL from the page origin: `http` becomes `ws`,
/// `https` becomes `wss`, host and port are kept.
pub fn dashboard_url(origin: &Url) -> Result<Url> {
    let scheme = match origin.scheme() {
        "http" => "ws",
        "https" => "wss",
        other => {
            return Err(ConsoleError::Config(format!(
                "cannot derive a WebSocket endpoint from a '{other}' origin"
            )))
        }
    };
    let host = origin
        .host_str()
        .ok_or_else(|| ConsoleError::Config(format!("origin '{origin}' has no host")))?;
    let authority = match origin.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };
    Url::parse(&format!("{scheme}://{authority}{DASHBOARD_PATH}"))
        .map_err(|e| ConsoleError::Config(e.to_string()))
}

// ---------------------------------------------------------------------------
// Connection manager
// ---------------------------------------------------------------------------

struct SyncState {
    url: Url,
    reconnect_delay: Duration,
    connect_timeout: Duration,
    toaster: Toaster,
    page: Page,
    state: Mutex<ConnectionState>,
    channel: Mutex<Option<JoinHandle<()>>>,
    reconnect: Mutex<Option<JoinHandle<()>>>,
    reconnect_generation: AtomicU64,
    running: AtomicBool,
    attempts: AtomicU64,
}

/// Handle to the dashboard channel. Clones share the same connection.
#[derive(Clone)]
pub struct StatusSync {
    inner: Arc<SyncState>,
}

impl StatusSync {
    pub fn new(origin: &Url, reconnect_delay: Duration, toaster: Toaster, page: Page) -> Result<Self> {
        Ok(Self {
            inner: Arc::new(SyncState {
                url: dashboard_url(origin)?,
                reconnect_delay,
                connect_timeout: Duration::from_secs(10),
                toaster,
                page,
                state: Mutex::new(ConnectionState::Closed),
                channel: Mutex::new(None),
                reconnect: Mutex::new(None),
                reconnect_generation: AtomicU64::new(0),
                running: AtomicBool::new(false),
                attempts: AtomicU64::new(0),
            }),
        })
    }

    /// Override the handshake timeout (default 10 s). Only effective before
    /// the handle is cloned.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        if let Some(state) = Arc::get_mut(&mut self.inner) {
            state.connect_timeout = timeout;
        }
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.inner.url
    }

    /// Open the channel. Must be called from within a tokio runtime. Calling
    /// it while already running is a no-op.
    pub fn start(&self) {
        if self.inner.running.swap(true, Ordering::AcqRel) {
            return;
        }
        info!(url = %self.inner.url, "status sync starting");
        self.inner.connect();
    }

    /// Close the channel and cancel any pending reconnect.
    pub fn stop(&self) {
        self.inner.running.store(false, Ordering::Release);
        if let Some(timer) = take(&self.inner.reconnect) {
            timer.abort();
        }
        if let Some(channel) = take(&self.inner.channel) {
            channel.abort();
        }
        self.inner.set_state(ConnectionState::Closed);
        info!(url = %self.inner.url, "status sync stopped");
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    pub fn state(&self) -> ConnectionState {
        *self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// `true` while a reconnect timer is armed and has not fired yet.
    pub fn reconnect_pending(&self) -> bool {
        self.inner.has_pending_reconnect()
    }

    /// Number of connection attempts made since creation.
    pub fn connection_attempts(&self) -> u64 {
        self.inner.attempts.load(Ordering::Acquire)
    }
}

impl SyncState {
    fn set_state(&self, next: ConnectionState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state != next {
            debug!(from = %*state, to = %next, "status channel transition");
            *state = next;
        }
    }

    fn connect(self: &Arc<Self>) {
        if !self.running.load(Ordering::Acquire) {
            return;
        }
        let attempt = self.attempts.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(url = %self.url, attempt, "opening status channel");
        self.set_state(ConnectionState::Connecting);

        let task = tokio::spawn(Arc::clone(self).run_channel());
        let previous = self
            .channel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(task);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    async fn run_channel(self: Arc<Self>) {
        let handshake =
            tokio::time::timeout(self.connect_timeout, tokio_tungstenite::connect_async(self.url.as_str()))
                .await;
        match handshake {
            Ok(Ok((ws, _response))) => {
                self.set_state(ConnectionState::Open);
                info!(url = %self.url, "status channel open");
                self.toaster.notify(
                    "Connected",
                    "WebSocket connection established",
                    NotificationKind::Info,
                );
                self.pump(ws).await;
            }
            Ok(Err(e)) => self.report_error(&e.to_string()),
            Err(_) => self.report_error("handshake timed out"),
        }
        self.handle_close();
    }

    async fn pump<S>(&self, mut stream: S)
    where
        S: Stream<Item = std::result::Result<WsMessage, WsError>> + Unpin,
    {
        while let Some(frame) = stream.next().await {
            match frame {
                Ok(WsMessage::Text(text)) => self.handle_frame(&text),
                Ok(WsMessage::Binary(bytes)) => match String::from_utf8(bytes) {
                    Ok(text) => self.handle_frame(&text),
                    Err(e) => self.drop_frame(&ConsoleError::decode("status frame", e)),
                },
                Ok(WsMessage::Close(frame)) => {
                    debug!(?frame, "server closed status channel");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    self.report_error(&e.to_string());
                    break;
                }
            }
        }
    }

    fn handle_frame(&self, text: &str) {
        match StatusPayload::decode(text) {
            Ok(payload) => {
                self.page
                    .set_status(payload.virtual_text(), payload.physical_text());
            }
            Err(e) => self.drop_frame(&e),
        }
    }

    fn drop_frame(&self, e: &ConsoleError) {
        warn!(error = %e, "dropping status frame");
        self.toaster.notify(
            "Error",
            "Failed to parse WebSocket data",
            NotificationKind::Error,
        );
    }

    fn report_error(&self, detail: &str) {
        warn!(url = %self.url, error = %detail, "status channel error");
        self.toaster
            .notify("Error", "WebSocket connection error", NotificationKind::Error);
    }

    fn handle_close(self: &Arc<Self>) {
        self.set_state(ConnectionState::Closed);
        info!(url = %self.url, "status channel closed");
        self.toaster.notify(
            "Disconnected",
            "WebSocket connection closed. Attempting to reconnect...",
            NotificationKind::Warning,
        );
        if self.running.load(Ordering::Acquire) {
            self.schedule_reconnect();
        }
    }

    fn schedule_reconnect(self: &Arc<Self>) {
        let me = Arc::clone(self);
        let delay = self.reconnect_delay;
        let generation = self.reconnect_generation.fetch_add(1, Ordering::AcqRel) + 1;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            me.clear_fired_timer(generation);
            me.connect();
        });
        let previous = self
            .reconnect
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(timer);
        if let Some(previous) = previous {
            debug!("replacing pending reconnect timer");
            previous.abort();
        }
    }

    /// Empty the reconnect slot when it still holds the timer of `generation`,
    /// so the slot only ever refers to a pending timer.
    fn clear_fired_timer(&self, generation: u64) {
        let mut slot = self.reconnect.lock().unwrap_or_else(PoisonError::into_inner);
        if self.reconnect_generation.load(Ordering::Acquire) == generation {
            slot.take();
        }
    }

    fn has_pending_reconnect(&self) -> bool {
        self.reconnect
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

fn take(slot: &Mutex<Option<JoinHandle<()>>>) -> Option<JoinHandle<()>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner).take()
}
