//! Add-node form.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{blank, SubmitOutcome, NODE_FORM};
use crate::console::Console;
use crate::error::ConsoleError;

pub const ADD_NODE_PATH: &str = "/add_node";

/// Raw field values as typed into the form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddNodeForm {
    pub node_id: String,
    pub host: String,
    pub port: String,
}

/// Body of `POST /add_node`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub node_id: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Default, Deserialize)]
struct AddNodeResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl AddNodeForm {
    pub fn new(node_id: impl Into<String>, host: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            host: host.into(),
            port: port.into(),
        }
    }

    /// Names of the fields currently left empty.
    pub fn invalid_fields(&self) -> Vec<&'static str> {
        [
            ("nodeId", &self.node_id),
            ("host", &self.host),
            ("port", &self.port),
        ]
        .into_iter()
        .filter(|(_, v)| blank(v))
        .map(|(name, _)| name)
        .collect()
    }

    /// Check and convert the fields into a request body.
    pub fn validate(&self) -> Result<NodeConfig, ConsoleError> {
        if !self.invalid_fields().is_empty() {
            return Err(ConsoleError::Validation("All fields are required".into()));
        }
        let port = self
            .port
            .trim()
            .parse::<u16>()
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| {
                ConsoleError::Validation("Port must be a number between 1 and 65535".into())
            })?;
        Ok(NodeConfig {
            node_id: self.node_id.trim().to_string(),
            host: self.host.trim().to_string(),
            port,
        })
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl Console {
    /// Ask the control panel to add a node to the ring.
    ///
    /// The form is cleared on success; any failure leaves it populated.
    pub async fn submit_add_node(&self, form: &mut AddNodeForm) -> SubmitOutcome {
        let config = match form.validate() {
            Ok(config) => config,
            Err(e) => return self.reject(&e.to_string()),
        };
        let Some(_permit) = self.guards.add_node.try_acquire() else {
            debug!("add-node already in flight, ignoring submit");
            return SubmitOutcome::Ignored;
        };

        let outcome = {
            let _controls = self.page.disable_form(NODE_FORM);
            self.send_add_node(&config).await
        };
        if outcome.is_success() {
            form.reset();
        }
        outcome
    }

    async fn send_add_node(&self, config: &NodeConfig) -> SubmitOutcome {
        let resp = match self.api.post_json(ADD_NODE_PATH, config).await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(error = %e, node_id = %config.node_id, "add-node request failed");
                self.notify_error("Error adding node");
                return SubmitOutcome::Failed(e);
            }
        };

        if !resp.is_success() {
            let message = format!("HTTP error! status: {}", resp.status);
            warn!(status = resp.status, node_id = %config.node_id, "add-node refused");
            self.notify_error(message.clone());
            return SubmitOutcome::Failed(ConsoleError::protocol(Some(resp.status), message));
        }

        let body: AddNodeResponse = match resp.json() {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "add-node response undecodable");
                self.notify_error("Error adding node");
                return SubmitOutcome::Failed(e);
            }
        };

        if body.status.as_deref() == Some("success") {
            info!(node_id = %config.node_id, host = %config.host, port = config.port, "node added");
            self.notify_success(
                body.message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "Node added successfully".to_string()),
            );
            SubmitOutcome::Succeeded
        } else {
            let message = body
                .message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "Failed to add node".to_string());
            warn!(node_id = %config.node_id, %message, "add-node rejected");
            self.notify_error(message.clone());
            SubmitOutcome::Failed(ConsoleError::protocol(Some(resp.status), message))
        }
    }
}
