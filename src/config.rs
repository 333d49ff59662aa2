//! Runtime configuration.
//!
//! Values come from built-in defaults, then an optional TOML file, then CLI
//! flags (see [`crate::cli::Args::apply_to`]). Every field has a default so a
//! partial file is valid.
//!
//! ```toml
//! origin = "https://dynamo.example.org"
//! reconnect_delay_ms = 5000
//! toast_ttl_ms = 5000
//! session_file = "/tmp/dynamo-session.json"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::{ConsoleError, Result};

pub const DEFAULT_ORIGIN: &str = "http://localhost:8000";
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 5_000;
pub const DEFAULT_TOAST_TTL_MS: u64 = 5_000;
pub const DEFAULT_REDIRECT_DELAY_MS: u64 = 800;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Origin the page was "served from"; HTTP routes and the dashboard
    /// WebSocket are both resolved against it.
    pub origin: String,
    /// Delay between a channel close and the next connection attempt.
    pub reconnect_delay_ms: u64,
    /// Lifetime of a notification banner before it removes itself.
    pub toast_ttl_ms: u64,
    /// Delay between a successful login/signup and the redirect to `/`.
    pub redirect_delay_ms: u64,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    /// When set, the session store is mirrored to this JSON file so separate
    /// invocations share the logged-in user.
    pub session_file: Option<PathBuf>,
    pub log_level: String,
    /// Print notifications to stderr as they are raised.
    pub echo: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            toast_ttl_ms: DEFAULT_TOAST_TTL_MS,
            redirect_delay_ms: DEFAULT_REDIRECT_DELAY_MS,
            connect_timeout_ms: 3_000,
            request_timeout_ms: 10_000,
            session_file: None,
            log_level: "info".to_string(),
            echo: true,
        }
    }
}

impl ConsoleConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(src: &str) -> Result<Self> {
        let cfg: ConsoleConfig = toml::from_str(src)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from `path`.
    ///
    /// # Errors
    /// `ConsoleError::Io` when the file cannot be read, `ConsoleError::Config`
    /// when it does not parse or fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let src = std::fs::read_to_string(path)?;
        Self::from_toml_str(&src)
    }

    pub fn validate(&self) -> Result<()> {
        self.origin_url()?;
        if self.reconnect_delay_ms == 0 {
            return Err(ConsoleError::Config(
                "reconnect_delay_ms must be greater than zero".into(),
            ));
        }
        if self.toast_ttl_ms == 0 {
            return Err(ConsoleError::Config(
                "toast_ttl_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// The origin as a URL; only `http` and `https` are accepted.
    pub fn origin_url(&self) -> Result<Url> {
        let url = Url::parse(&self.origin)
            .map_err(|e| ConsoleError::Config(format!("invalid origin '{}': {e}", self.origin)))?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConsoleError::Config(format!(
                "origin scheme must be http or https, got '{other}'"
            ))),
        }
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn toast_ttl(&self) -> Duration {
        Duration::from_millis(self.toast_ttl_ms)
    }

    pub fn redirect_delay(&self) -> Duration {
        Duration::from_millis(self.redirect_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
