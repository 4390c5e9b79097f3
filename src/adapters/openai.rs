//! # OpenAI Adapter
//!
//! Adapter for OpenAI and OpenAI-compatible backends. Requests are already
//! in the right shape, so the body is forwarded nearly verbatim: the model
//! is resolved, the stream flag pinned, and everything else - including
//! unknown extension fields - passes through untouched.

use crate::{
    adapters::base::{extract_model, send_json, AdapterTrait, UpstreamRequest},
    connector::RetryBudget,
    error::ProxyError,
    schemas::ChatCompletionRequest,
};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct OpenAiAdapter {
    base: String,
    model_id: String,
    token: Option<String>,
}

impl OpenAiAdapter {
    pub fn new(base: String, model_id: String, token: Option<String>) -> Self {
        Self {
            base,
            model_id,
            token,
        }
    }

    fn chat_completions_url(&self) -> String {
        let base = self.base.trim_end_matches('/');
        if base.ends_with("/v1") {
            format!("{}/chat/completions", base)
        } else {
            format!("{}/v1/chat/completions", base)
        }
    }
}

#[async_trait::async_trait]
impl AdapterTrait for OpenAiAdapter {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn base_url(&self) -> &str {
        &self.base
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn has_auth(&self) -> bool {
        self.token.is_some()
    }

    fn build_chat_request(
        &self,
        request: &ChatCompletionRequest,
        stream: bool,
    ) -> Result<UpstreamRequest, ProxyError> {
        let model = extract_model(request, &self.model_id);
        let mut body = serde_json::to_value(request)?;
        body["model"] = Value::String(model);
        body["stream"] = Value::Bool(stream);

        Ok(UpstreamRequest {
            url: self.chat_completions_url(),
            body,
            bearer_token: self.token.clone(),
        })
    }

    async fn chat_completions(
        &self,
        client: &Client,
        request: &ChatCompletionRequest,
        budget: RetryBudget,
        timeout: Duration,
    ) -> Result<Value, ProxyError> {
        debug!(
            adapter = self.name(),
            model = %extract_model(request, &self.model_id),
            messages = request.messages.len(),
            "forwarding chat completion"
        );
        let upstream = self.build_chat_request(request, false)?;
        // Already OpenAI-shaped, forward the body as-is.
        send_json(&upstream, client, budget, timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::Message;
    use serde_json::json;

    fn adapter() -> OpenAiAdapter {
        OpenAiAdapter::new(
            "https://api.openai.com/v1".to_string(),
            "gpt-4o-mini".to_string(),
            Some("sk-test".to_string()),
        )
    }

    #[test]
    fn url_respects_existing_v1_suffix() {
        assert_eq!(
            adapter().chat_completions_url(),
            "https://api.openai.com/v1/chat/completions"
        );

        let bare = OpenAiAdapter::new("http://localhost:8000".to_string(), "m".to_string(), None);
        assert_eq!(
            bare.chat_completions_url(),
            "http://localhost:8000/v1/chat/completions"
        );
    }

    #[test]
    fn build_pins_stream_flag_and_model() {
        let request = ChatCompletionRequest {
            messages: vec![Message::user("hi")],
            stream: Some(false),
            ..Default::default()
        };

        let upstream = adapter().build_chat_request(&request, true).unwrap();
        assert_eq!(upstream.body["stream"], json!(true));
        assert_eq!(upstream.body["model"], json!("gpt-4o-mini"));
        assert_eq!(upstream.bearer_token.as_deref(), Some("sk-test"));
    }

    #[test]
    fn build_forwards_extension_fields() {
        let raw = json!({
            "model": "gpt-4o",
            "messages": [{"role": "user", "content": "hi"}],
            "tools": [{"type": "function", "function": {"name": "f"}}],
        });
        let request: ChatCompletionRequest = serde_json::from_value(raw).unwrap();

        let upstream = adapter().build_chat_request(&request, false).unwrap();
        assert_eq!(upstream.body["tools"][0]["function"]["name"], json!("f"));
        assert_eq!(upstream.body["model"], json!("gpt-4o"));
    }
}
