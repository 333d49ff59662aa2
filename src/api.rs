//! Shared HTTP plumbing for the form handlers and gallery loaders.
//!
//! All routes are resolved against the configured origin. A response is read
//! fully into memory and handed back as an [`ApiResponse`]; interpreting the
//! status and body is left to each handler, since every route signals success
//! differently.

use reqwest::multipart;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::ConsoleConfig;
use crate::error::{ConsoleError, Result};

/// Fields checked, in order, for a human-readable server message.
pub const MESSAGE_FIELDS: &[&str] = &["error", "detail", "message"];

#[derive(Clone)]
pub struct Api {
    client: reqwest::Client,
    origin: Url,
}

impl Api {
    pub fn new(config: &ConsoleConfig) -> Result<Self> {
        let origin = config.origin_url()?;
        // Builder only fails in broken TLS environments; fall back to defaults.
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .unwrap_or_default();
        Ok(Self { client, origin })
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Resolve an absolute route path against the origin.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.origin
            .join(path)
            .map_err(|e| ConsoleError::Config(format!("invalid route '{path}': {e}")))
    }

    pub async fn get(&self, path: &str) -> Result<ApiResponse> {
        let url = self.endpoint(path)?;
        self.send(url.clone(), self.client.get(url)).await
    }

    pub async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<ApiResponse> {
        let url = self.endpoint(path)?;
        self.send(url.clone(), self.client.post(url).json(body)).await
    }

    pub async fn post_empty(&self, path: &str) -> Result<ApiResponse> {
        let url = self.endpoint(path)?;
        let req = self
            .client
            .post(url.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        self.send(url, req).await
    }

    pub async fn post_multipart(&self, path: &str, form: multipart::Form) -> Result<ApiResponse> {
        let url = self.endpoint(path)?;
        self.send(url.clone(), self.client.post(url).multipart(form)).await
    }

    async fn send(&self, url: Url, req: reqwest::RequestBuilder) -> Result<ApiResponse> {
        let resp = req.send().await.map_err(|e| ConsoleError::Network {
            url: url.to_string(),
            detail: e.to_string(),
        })?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await.map_err(|e| ConsoleError::Network {
            url: url.to_string(),
            detail: e.to_string(),
        })?;
        debug!(%url, status, bytes = body.len(), "response");
        Ok(ApiResponse {
            url: url.to_string(),
            status,
            body: body.to_vec(),
        })
    }
}

/// A fully-read HTTP response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub url: String,
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| ConsoleError::decode(self.url.clone(), e))
    }

    /// The body as loose JSON, `None` when it does not parse.
    pub fn value(&self) -> Option<serde_json::Value> {
        serde_json::from_slice(&self.body).ok()
    }

    /// First non-empty string among [`MESSAGE_FIELDS`] in a JSON object body.
    pub fn server_message(&self) -> Option<String> {
        self.value().as_ref().and_then(server_message)
    }
}

/// First non-empty string among [`MESSAGE_FIELDS`] in `value`.
pub fn server_message(value: &serde_json::Value) -> Option<String> {
    MESSAGE_FIELDS
        .iter()
        .filter_map(|k| value.get(*k).and_then(|v| v.as_str()))
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn response(status: u16, body: &str) -> ApiResponse {
        ApiResponse {
            url: "http://localhost/test".into(),
            status,
            body: body.as_bytes().to_vec(),
        }
    }

    #[rstest]
    #[case(200, true)]
    #[case(204, true)]
    #[case(299, true)]
    #[case(301, false)]
    #[case(401, false)]
    #[case(500, false)]
    fn test_is_success(#[case] status: u16, #[case] ok: bool) {
        assert_eq!(response(status, "{}").is_success(), ok);
    }

    #[rstest]
    #[case(json!({"error": "bad password"}), Some("bad password"))]
    #[case(json!({"detail": "Invalid credentials"}), Some("Invalid credentials"))]
    #[case(json!({"message": "Failed to add node"}), Some("Failed to add node"))]
    #[case(json!({"error": "", "detail": "fallthrough"}), Some("fallthrough"))]
    #[case(json!({"detail": 42}), None)]
    #[case(json!([1, 2]), None)]
    fn test_server_message(#[case] body: serde_json::Value, #[case] expected: Option<&str>) {
        assert_eq!(server_message(&body).as_deref(), expected);
    }

    #[test]
    fn test_server_message_on_non_json_body() {
        assert_eq!(response(500, "<html>oops</html>").server_message(), None);
    }

    #[test]
    fn test_json_decode_error_is_decode_variant() {
        let err = response(200, "nope").json::<serde_json::Value>().unwrap_err();
        assert!(matches!(err, ConsoleError::Decode { .. }));
    }

    #[test]
    fn test_endpoint_resolves_against_origin() {
        let cfg = ConsoleConfig {
            origin: "https://ring.example:8443/dashboard".into(),
            ..Default::default()
        };
        let api = Api::new(&cfg).unwrap();
        assert_eq!(
            api.endpoint("/add_node").unwrap().as_str(),
            "https://ring.example:8443/add_node"
        );
    }
}
