//! # Ollama Adapter
//!
//! Adapter for Ollama-style backends speaking NDJSON on `/api/chat`.
//! Outbound requests are converted to Ollama's native chat shape; inbound
//! non-streaming responses are wrapped back into the OpenAI envelope so the
//! client never sees the native format. Streamed NDJSON bodies are handled
//! by the relay pipeline, not here.

use crate::{
    adapters::base::{
        completion_id, current_timestamp, extract_model, send_json, AdapterTrait, UpstreamRequest,
    },
    connector::RetryBudget,
    error::ProxyError,
    schemas::ChatCompletionRequest,
};
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct OllamaAdapter {
    base: String,
    model_id: String,
    token: Option<String>,
}

impl OllamaAdapter {
    pub fn new(base: String, model_id: String, token: Option<String>) -> Self {
        Self {
            base,
            model_id,
            token,
        }
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base.trim_end_matches('/'))
    }

    /// Map OpenAI sampling parameters onto Ollama's `options` object.
    fn options_from(request: &ChatCompletionRequest) -> Map<String, Value> {
        let mut options = Map::new();
        if let Some(temperature) = request.temperature {
            options.insert("temperature".to_string(), json!(temperature));
        }
        if let Some(top_p) = request.top_p {
            options.insert("top_p".to_string(), json!(top_p));
        }
        if let Some(max_tokens) = request.max_tokens {
            options.insert("num_predict".to_string(), json!(max_tokens));
        }
        if let Some(stop) = &request.stop {
            options.insert("stop".to_string(), json!(stop));
        }
        options
    }

    /// Wrap an Ollama chat response in the OpenAI completion envelope.
    fn to_openai_envelope(&self, model: &str, native: &Value) -> Value {
        let content = native
            .get("message")
            .and_then(|message| message.get("content"))
            .and_then(Value::as_str)
            .unwrap_or("");
        let prompt_tokens = native
            .get("prompt_eval_count")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        let completion_tokens = native.get("eval_count").and_then(Value::as_u64).unwrap_or(0);
        let finish_reason = match native.get("done_reason").and_then(Value::as_str) {
            Some("length") => "length",
            _ => "stop",
        };

        json!({
            "id": completion_id(),
            "object": "chat.completion",
            "created": current_timestamp(),
            "model": model,
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": finish_reason,
            }],
            "usage": {
                "prompt_tokens": prompt_tokens,
                "completion_tokens": completion_tokens,
                "total_tokens": prompt_tokens + completion_tokens,
            },
        })
    }
}

#[async_trait::async_trait]
impl AdapterTrait for OllamaAdapter {
    fn name(&self) -> &'static str {
        "ollama"
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

        let messages: Vec<Value> = request
            .messages
            .iter()
            .map(|message| {
                json!({
                    "role": message.role,
                    "content": message.content.as_deref().unwrap_or(""),
                })
            })
            .collect();

        let mut body = json!({
            "model": model,
            "messages": messages,
            "stream": stream,
        });
        let options = Self::options_from(request);
        if !options.is_empty() {
            body["options"] = Value::Object(options);
        }

        Ok(UpstreamRequest {
            url: self.chat_url(),
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
        let model = extract_model(request, &self.model_id);
        debug!(
            adapter = self.name(),
            model = %model,
            messages = request.messages.len(),
            "forwarding chat completion"
        );

        let upstream = self.build_chat_request(request, false)?;
        let native = send_json(&upstream, client, budget, timeout).await?;
        Ok(self.to_openai_envelope(&model, &native))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::Message;

    fn adapter() -> OllamaAdapter {
        OllamaAdapter::new("http://localhost:11434".to_string(), "llama3".to_string(), None)
    }

    #[test]
    fn build_converts_to_native_chat_shape() {
        let request = ChatCompletionRequest {
            messages: vec![Message::system("be brief"), Message::user("hello")],
            temperature: Some(0.2),
            max_tokens: Some(64),
            ..Default::default()
        };

        let upstream = adapter().build_chat_request(&request, true).unwrap();
        assert_eq!(upstream.url, "http://localhost:11434/api/chat");
        assert_eq!(upstream.body["stream"], json!(true));
        assert_eq!(upstream.body["messages"][0]["role"], json!("system"));
        assert_eq!(upstream.body["messages"][1]["content"], json!("hello"));
        assert_eq!(upstream.body["options"]["temperature"], json!(0.2));
        assert_eq!(upstream.body["options"]["num_predict"], json!(64));
    }

    #[test]
    fn build_omits_empty_options() {
        let request = ChatCompletionRequest {
            messages: vec![Message::user("hi")],
            ..Default::default()
        };

        let upstream = adapter().build_chat_request(&request, false).unwrap();
        assert!(upstream.body.get("options").is_none());
    }

    #[test]
    fn envelope_carries_content_and_usage() {
        let native = json!({
            "message": {"role": "assistant", "content": "Paris."},
            "done": true,
            "prompt_eval_count": 12,
            "eval_count": 3,
        });

        let envelope = adapter().to_openai_envelope("llama3", &native);
        assert_eq!(envelope["object"], json!("chat.completion"));
        assert_eq!(
            envelope["choices"][0]["message"]["content"],
            json!("Paris.")
        );
        assert_eq!(envelope["choices"][0]["finish_reason"], json!("stop"));
        assert_eq!(envelope["usage"]["prompt_tokens"], json!(12));
        assert_eq!(envelope["usage"]["total_tokens"], json!(15));
    }

    #[test]
    fn envelope_maps_length_stop_reason() {
        let native = json!({
            "message": {"content": "truncat"},
            "done_reason": "length",
        });

        let envelope = adapter().to_openai_envelope("llama3", &native);
        assert_eq!(envelope["choices"][0]["finish_reason"], json!("length"));
    }
}
