//! # Notification toaster
//!
//! A single banner container, created once at startup and shared by every
//! component through cheap clones. Each [`Toaster::notify`] call appends one
//! banner and arms a timer that removes it after the configured TTL; a manual
//! [`Toaster::dismiss`] removes it earlier. Removal is idempotent, so the timer
//! firing after a manual dismiss is a no-op.
//!
//! Subscribers (the terminal echo, tests) can follow raised banners through
//! [`Toaster::subscribe`].

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use colored::*;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Capacity of the raised-banner broadcast channel.
pub const NOTIFY_CHANNEL_CAP: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationKind::Success => write!(f, "success"),
            NotificationKind::Error => write!(f, "error"),
            NotificationKind::Warning => write!(f, "warning"),
            NotificationKind::Info => write!(f, "info"),
        }
    }
}

/// Background / border / text colours of a banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: &'static str,
    pub border: &'static str,
    pub text: &'static str,
}

impl NotificationKind {
    pub fn palette(self) -> Palette {
        match self {
            NotificationKind::Success => Palette {
                background: "#d4edda",
                border: "#c3e6cb",
                text: "#155724",
            },
            NotificationKind::Error => Palette {
                background: "#f8d7da",
                border: "#f5c6cb",
                text: "#721c24",
            },
            NotificationKind::Warning => Palette {
                background: "#fff3cd",
                border: "#ffeeba",
                text: "#856404",
            },
            NotificationKind::Info => Palette {
                background: "#cce5ff",
                border: "#b8daff",
                text: "#004085",
            },
        }
    }

    fn terminal_badge(self) -> ColoredString {
        match self {
            NotificationKind::Success => " OK ".black().on_green(),
            NotificationKind::Error => " ERR ".white().on_red(),
            NotificationKind::Warning => " WARN ".black().on_yellow(),
            NotificationKind::Info => " INFO ".white().on_blue(),
        }
    }
}

/// One banner currently (or formerly) on screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub created_at_ms: u64,
}

struct ToasterState {
    banners: Mutex<Vec<Notification>>,
    ttl: Duration,
    echo: bool,
    tx: broadcast::Sender<Notification>,
}

/// Handle to the page's notification container.
#[derive(Clone)]
pub struct Toaster {
    inner: Arc<ToasterState>,
}

impl Toaster {
    /// Create the container. Banners expire after `ttl`; with `echo` each
    /// raised banner is also printed to stderr.
    pub fn new(ttl: Duration, echo: bool) -> Self {
        let (tx, _) = broadcast::channel(NOTIFY_CHANNEL_CAP);
        Self {
            inner: Arc::new(ToasterState {
                banners: Mutex::new(Vec::new()),
                ttl,
                echo,
                tx,
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Append a banner and schedule its removal. Returns the banner id.
    ///
    /// Outside a tokio runtime no timer can be armed; the banner then stays
    /// until dismissed.
    pub fn notify(
        &self,
        title: impl Into<String>,
        message: impl Into<String>,
        kind: NotificationKind,
    ) -> Uuid {
        let banner = Notification {
            id: Uuid::new_v4(),
            title: title.into(),
            message: message.into(),
            kind,
            created_at_ms: now_ms(),
        };
        let id = banner.id;

        match kind {
            NotificationKind::Error => error!(title = %banner.title, message = %banner.message, "notification"),
            NotificationKind::Warning => warn!(title = %banner.title, message = %banner.message, "notification"),
            _ => info!(title = %banner.title, message = %banner.message, %kind, "notification"),
        }

        if self.inner.echo {
            eprintln!(
                "{} {}: {}",
                kind.terminal_badge(),
                banner.title.bold(),
                banner.message
            );
        }

        self.lock().push(banner.clone());
        // No subscribers is fine.
        let _ = self.inner.tx.send(banner);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let toaster = self.clone();
                let ttl = self.inner.ttl;
                handle.spawn(async move {
                    tokio::time::sleep(ttl).await;
                    toaster.dismiss(id);
                });
            }
            Err(_) => debug!(%id, "no runtime, banner will not auto-expire"),
        }

        id
    }

    /// Remove a banner. Returns `false` when it was already gone.
    pub fn dismiss(&self, id: Uuid) -> bool {
        let mut banners = self.lock();
        match banners.iter().position(|b| b.id == id) {
            Some(idx) => {
                banners.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Snapshot of the banners currently shown, oldest first.
    pub fn banners(&self) -> Vec<Notification> {
        self.lock().clone()
    }

    pub fn latest(&self) -> Option<Notification> {
        self.lock().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.inner.tx.subscribe()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Notification>> {
        self.inner
            .banners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Current Unix epoch in milliseconds.
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
