//! Headless console for the Dynamo control panel.
//!
//! Mirrors what the panel's pages do in a browser tab: a live ring-status
//! channel over WebSocket, a notification toaster, and the login / signup /
//! add-node / image forms, all driven from a tokio runtime against an
//! in-process [`page::Page`] model instead of a DOM.

pub mod api;
pub mod cli;
pub mod config;
pub mod console;
pub mod error;
pub mod forms;
pub mod gallery;
pub mod guard;
pub mod notify;
pub mod page;
pub mod session;
pub mod status;

pub use config::ConsoleConfig;
pub use console::Console;
pub use error::{ConsoleError, Result};
pub use forms::SubmitOutcome;
pub use notify::{Notification, NotificationKind, Toaster};
pub use page::Page;
pub use session::SessionStore;
pub use status::{ConnectionState, StatusPayload, StatusSync};
