//! The console: one value wiring together everything a dashboard page holds.
//!
//! Construction is explicit and happens once at startup; the toaster, page,
//! session store and status channel are created here and shared by reference
//! (cheap clones) with every handler afterwards.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::api::Api;
use crate::config::ConsoleConfig;
use crate::error::Result;
use crate::guard::FormGuards;
use crate::notify::{NotificationKind, Toaster};
use crate::page::Page;
use crate::session::SessionStore;
use crate::status::StatusSync;

#[derive(Clone)]
pub struct Console {
    pub(crate) config: Arc<ConsoleConfig>,
    pub(crate) api: Api,
    pub(crate) toaster: Toaster,
    pub(crate) page: Page,
    pub(crate) session: SessionStore,
    pub(crate) guards: FormGuards,
    pub(crate) status: StatusSync,
}

impl Console {
    /// Build a console from a validated config.
    ///
    /// # Errors
    /// `ConsoleError::Config` for an unusable origin, or the session file's
    /// load error when one is configured.
    pub fn new(config: ConsoleConfig) -> Result<Self> {
        config.validate()?;
        let session = match &config.session_file {
            Some(path) => SessionStore::with_file(path)?,
            None => SessionStore::in_memory(),
        };
        Self::with_session(config, session)
    }

    /// Build a console around an existing session store.
    pub fn with_session(config: ConsoleConfig, session: SessionStore) -> Result<Self> {
        let api = Api::new(&config)?;
        let toaster = Toaster::new(config.toast_ttl(), config.echo);
        let page = Page::default();
        let status = StatusSync::new(
            api.origin(),
            config.reconnect_delay(),
            toaster.clone(),
            page.clone(),
        )?
        .with_connect_timeout(config.connect_timeout());
        page.render_navigation(session.logged_in_user().as_deref());

        Ok(Self {
            config: Arc::new(config),
            api,
            toaster,
            page,
            session,
            guards: FormGuards::default(),
            status,
        })
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    pub fn toaster(&self) -> &Toaster {
        &self.toaster
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn status(&self) -> &StatusSync {
        &self.status
    }

    pub fn guards(&self) -> &FormGuards {
        &self.guards
    }

    pub(crate) fn notify_success(&self, message: impl Into<String>) {
        self.toaster.notify("Success", message, NotificationKind::Success);
    }

    pub(crate) fn notify_error(&self, message: impl Into<String>) {
        self.toaster.notify("Error", message, NotificationKind::Error);
    }

    /// Wait for a scheduled redirect to `target` to land. Gives up after twice
    /// the configured redirect delay; returns whether the page got there.
    pub async fn await_redirect(&self, target: &str) -> bool {
        let deadline = tokio::time::Instant::now() + self.config.redirect_delay() * 2;
        while self.page.location() != target {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        true
    }

    /// Navigate to `location` after `delay` without blocking the caller.
    pub(crate) fn schedule_redirect(&self, location: &str, delay: Duration) {
        let page = self.page.clone();
        let location = location.to_string();
        debug!(%location, delay_ms = delay.as_millis() as u64, "redirect scheduled");
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            page.navigate(location);
        });
    }
}
