//! Crate-wide error type.
//!
//! The variants follow the failure taxonomy every console operation reports
//! through: transport failures, server-side refusals, undecodable bodies and
//! local validation. None of them is fatal; callers turn each one into a
//! user-visible notification and return to an interactive state.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = ConsoleError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ConsoleError {
    /// The request never produced a response (connect refused, timeout,
    /// socket error mid-body).
    #[error("network failure contacting {url}: {detail}")]
    Network { url: String, detail: String },

    /// The server answered, but not with a success indicator.
    #[error("{message}")]
    Protocol { status: Option<u16>, message: String },

    /// A body or frame could not be decoded as the expected JSON.
    #[error("could not decode {context}: {detail}")]
    Decode { context: String, detail: String },

    /// A required field was missing or malformed; no request was sent.
    #[error("{0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConsoleError {
    pub fn protocol(status: Option<u16>, message: impl Into<String>) -> Self {
        ConsoleError::Protocol {
            status,
            message: message.into(),
        }
    }

    pub fn decode(context: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        ConsoleError::Decode {
            context: context.into(),
            detail: detail.to_string(),
        }
    }

    /// Short machine-friendly label for log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ConsoleError::Network { .. } => "network",
            ConsoleError::Protocol { .. } => "protocol",
            ConsoleError::Decode { .. } => "decode",
            ConsoleError::Validation(_) => "validation",
            ConsoleError::Config(_) => "config",
            ConsoleError::Io(_) => "io",
        }
    }
}

impl From<toml::de::Error> for ConsoleError {
    fn from(e: toml::de::Error) -> Self {
        ConsoleError::Config(e.to_string())
    }
}
