//! # Schemas Module
//!
//! Data structures for OpenAI-compatible chat completions, covering both
//! regular and streaming responses.
//!
//! Messages keep unknown fields in a flattened extension map instead of
//! dropping them, so provider-specific extensions survive the round trip
//! through the gateway untouched. The sanitizer operates on that same map.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// OpenAI-compatible chat completion request.
///
/// Only the fields the gateway itself inspects are typed; everything else
/// (tools, response_format, provider extensions, ...) rides along in
/// `extra` and is forwarded verbatim.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChatCompletionRequest {
    /// List of messages in the conversation
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Model identifier (optional, uses the configured default if absent)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Nucleus sampling parameter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    /// Whether to stream the response back as Server-Sent Events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    /// Stop sequences to end generation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    /// User identifier for tracking
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    /// Unrecognized fields, forwarded to the upstream provider as-is
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One conversation message.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Message {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Unrecognized fields. Preserved verbatim except for the sanitizer's
    /// deny-list of provider-internal keys.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: Some(content.into()),
            ..Default::default()
        }
    }

    pub fn assistant(content: Option<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub index: u32,
    pub message: Message,
    pub finish_reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// # Streaming Response Structures
///
/// OpenAI's `chat.completion.chunk` wire shape, used when the gateway
/// transforms a non-SSE upstream (NDJSON) into client-facing SSE frames.
#[derive(Debug, Serialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    /// Always "chat.completion.chunk"
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<StreamChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

#[derive(Debug, Serialize)]
pub struct StreamChoice {
    pub index: u32,
    pub delta: StreamDelta,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StreamDelta {
    /// Role, only present in the first chunk
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// Error payload carried in a terminal in-band stream frame.
#[derive(Debug, Serialize)]
pub struct StreamingError {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetails {
    pub message: String,
    pub r#type: String,
    pub code: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_preserves_unknown_fields() {
        let raw = json!({
            "role": "assistant",
            "content": "hi",
            "vendor_hint": {"cache": true},
        });

        let msg: Message = serde_json::from_value(raw).unwrap();
        assert_eq!(msg.role, "assistant");
        assert_eq!(msg.extra.get("vendor_hint").unwrap()["cache"], true);

        let round_tripped = serde_json::to_value(&msg).unwrap();
        assert_eq!(round_tripped["vendor_hint"]["cache"], true);
    }

    #[test]
    fn request_forwards_unknown_top_level_fields() {
        let raw = json!({
            "model": "llama",
            "messages": [{"role": "user", "content": "hey"}],
            "response_format": {"type": "json_object"},
        });

        let req: ChatCompletionRequest = serde_json::from_value(raw).unwrap();
        assert!(req.extra.contains_key("response_format"));

        let out = serde_json::to_value(&req).unwrap();
        assert_eq!(out["response_format"]["type"], "json_object");
    }

    #[test]
    fn chunk_omits_empty_fields() {
        let chunk = ChatCompletionChunk {
            id: "chatcmpl-x".into(),
            object: "chat.completion.chunk".into(),
            created: 0,
            model: "m".into(),
            choices: vec![StreamChoice {
                index: 0,
                delta: StreamDelta {
                    role: None,
                    content: Some("tok".into()),
                },
                finish_reason: None,
            }],
            usage: None,
        };

        let out = serde_json::to_value(&chunk).unwrap();
        assert!(out.get("usage").is_none());
        assert!(out["choices"][0]["delta"].get("role").is_none());
        // finish_reason stays as an explicit null, OpenAI clients expect it
        assert!(out["choices"][0]["finish_reason"].is_null());
    }

    #[test]
    fn usage_totals() {
        let usage = Usage::new(7, 5);
        assert_eq!(usage.total_tokens, 12);
    }
}
