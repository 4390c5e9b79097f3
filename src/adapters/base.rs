//! # Base Adapter Functionality
//!
//! The trait all backend adapters implement, the upstream request value
//! they produce, and small helpers shared across adapters.

use crate::{
    connector::{self, RetryBudget},
    error::ProxyError,
    schemas::ChatCompletionRequest,
};
use reqwest::Client;
use serde_json::Value;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// A fully-prepared upstream HTTP request: URL, JSON body, and optional
/// bearer token. Built by an adapter, sent through the connector.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub url: String,
    pub body: Value,
    pub bearer_token: Option<String>,
}

impl UpstreamRequest {
    /// Turn this into a reqwest builder on the shared pooled client.
    pub fn builder(&self, client: &Client) -> reqwest::RequestBuilder {
        let mut builder = client.post(&self.url).json(&self.body);
        if let Some(token) = &self.bearer_token {
            builder = builder.bearer_auth(token);
        }
        builder
    }
}

/// Behavior every backend adapter provides.
#[async_trait::async_trait]
pub trait AdapterTrait: Send + Sync {
    /// Adapter name for logging
    fn name(&self) -> &'static str;

    fn base_url(&self) -> &str;

    /// Default model used when the request does not name one
    fn model_id(&self) -> &str;

    fn has_auth(&self) -> bool;

    /// Build the upstream request for a chat completion. `stream` selects
    /// the wire mode requested from the backend.
    fn build_chat_request(
        &self,
        request: &ChatCompletionRequest,
        stream: bool,
    ) -> Result<UpstreamRequest, ProxyError>;

    /// Non-streaming chat completion: one upstream round trip, returning an
    /// OpenAI-shaped JSON body.
    async fn chat_completions(
        &self,
        client: &Client,
        request: &ChatCompletionRequest,
        budget: RetryBudget,
        timeout: Duration,
    ) -> Result<Value, ProxyError>;
}

/// Resolve the effective model for a request.
pub fn extract_model(request: &ChatCompletionRequest, default_model: &str) -> String {
    request
        .model
        .clone()
        .unwrap_or_else(|| default_model.to_string())
}

/// Unix timestamp for response metadata.
pub fn current_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs() as i64)
        .unwrap_or(0)
}

/// Fresh OpenAI-style completion id.
pub fn completion_id() -> String {
    format!("chatcmpl-{}", &Uuid::new_v4().simple().to_string()[..12])
}

/// One round trip through the connector, parsed as JSON.
pub async fn send_json(
    upstream: &UpstreamRequest,
    client: &Client,
    budget: RetryBudget,
    timeout: Duration,
) -> Result<Value, ProxyError> {
    let builder = upstream.builder(client).timeout(timeout);
    let response = connector::connect(builder, budget).await?;
    response.json::<Value>().await.map_err(ProxyError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_model_prefers_request() {
        let request = ChatCompletionRequest {
            model: Some("custom".to_string()),
            ..Default::default()
        };
        assert_eq!(extract_model(&request, "default"), "custom");

        let bare = ChatCompletionRequest::default();
        assert_eq!(extract_model(&bare, "default"), "default");
    }

    #[test]
    fn completion_ids_are_unique_and_prefixed() {
        let a = completion_id();
        let b = completion_id();
        assert!(a.starts_with("chatcmpl-"));
        assert_ne!(a, b);
    }

    #[test]
    fn builder_attaches_bearer_token() {
        let upstream = UpstreamRequest {
            url: "http://localhost:9999/v1/chat/completions".to_string(),
            body: serde_json::json!({"model": "m"}),
            bearer_token: Some("secret".to_string()),
        };

        let client = Client::new();
        let request = upstream.builder(&client).build().unwrap();
        let auth = request.headers().get("authorization").unwrap();
        assert_eq!(auth, "Bearer secret");
    }
}
