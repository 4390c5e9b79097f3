//! # Client Frame Construction
//!
//! Builders for the SSE frames the gateway sends to its own client:
//! OpenAI `chat.completion.chunk` envelopes for transformed streams, the
//! `[DONE]` terminal sentinel, and the single in-band error frame.

use crate::{
    error::ProxyError,
    schemas::{ChatCompletionChunk, ErrorDetails, StreamChoice, StreamDelta, StreamingError, Usage},
};
use crate::adapters::base::{completion_id, current_timestamp};

/// Per-stream chunk-building state: one completion id shared by every
/// chunk of the response, and the running chunk index (the first chunk
/// carries the assistant role).
#[derive(Debug, Clone)]
pub struct StreamingState {
    pub request_id: String,
    pub model: String,
    pub chunk_index: usize,
}

impl StreamingState {
    pub fn new(model: String) -> Self {
        Self {
            request_id: completion_id(),
            model,
            chunk_index: 0,
        }
    }

    fn next_index(&mut self) -> usize {
        let index = self.chunk_index;
        self.chunk_index += 1;
        index
    }
}

/// Wrap a payload in SSE data framing.
pub fn sse_data_frame(payload: &str) -> String {
    format!("data: {}\n\n", payload)
}

/// The wire-level success terminator.
pub fn done_frame() -> String {
    sse_data_frame("[DONE]")
}

/// A content chunk in OpenAI streaming shape.
pub fn content_chunk(state: &mut StreamingState, content: &str) -> String {
    let index = state.next_index();
    let chunk = ChatCompletionChunk {
        id: state.request_id.clone(),
        object: "chat.completion.chunk".to_string(),
        created: current_timestamp(),
        model: state.model.clone(),
        choices: vec![StreamChoice {
            index: 0,
            delta: StreamDelta {
                role: (index == 0).then(|| "assistant".to_string()),
                content: Some(content.to_string()),
            },
            finish_reason: None,
        }],
        usage: None,
    };

    sse_data_frame(&serde_json::to_string(&chunk).unwrap_or_default())
}

/// The closing chunk of a message: empty delta, `finish_reason: "stop"`,
/// and usage when the upstream reported it.
pub fn final_chunk(state: &mut StreamingState, usage: Option<Usage>) -> String {
    state.next_index();
    let chunk = ChatCompletionChunk {
        id: state.request_id.clone(),
        object: "chat.completion.chunk".to_string(),
        created: current_timestamp(),
        model: state.model.clone(),
        choices: vec![StreamChoice {
            index: 0,
            delta: StreamDelta {
                role: None,
                content: None,
            },
            finish_reason: Some("stop".to_string()),
        }],
        usage,
    };

    sse_data_frame(&serde_json::to_string(&chunk).unwrap_or_default())
}

/// The single in-band error frame. Self-describing: the HTTP response has
/// already started, so the message and machine code here are all the
/// client will ever learn about the failure.
pub fn error_frame(error: &ProxyError) -> String {
    let payload = StreamingError {
        error: ErrorDetails {
            message: error.to_string(),
            r#type: error.kind().to_string(),
            code: error.code().to_string(),
        },
    };

    sse_data_frame(&serde_json::to_string(&payload).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn payload_of(frame: &str) -> Value {
        let inner = frame
            .strip_prefix("data: ")
            .and_then(|rest| rest.strip_suffix("\n\n"))
            .expect("SSE framing");
        serde_json::from_str(inner).expect("JSON payload")
    }

    #[test]
    fn first_chunk_carries_role() {
        let mut state = StreamingState::new("llama3".to_string());

        let first = payload_of(&content_chunk(&mut state, "Hel"));
        assert_eq!(first["choices"][0]["delta"]["role"], "assistant");
        assert_eq!(first["choices"][0]["delta"]["content"], "Hel");

        let second = payload_of(&content_chunk(&mut state, "lo"));
        assert!(second["choices"][0]["delta"].get("role").is_none());
    }

    #[test]
    fn chunks_share_one_completion_id() {
        let mut state = StreamingState::new("m".to_string());
        let a = payload_of(&content_chunk(&mut state, "x"));
        let b = payload_of(&final_chunk(&mut state, None));
        assert_eq!(a["id"], b["id"]);
        assert_eq!(b["object"], "chat.completion.chunk");
    }

    #[test]
    fn final_chunk_reports_stop_and_usage() {
        let mut state = StreamingState::new("m".to_string());
        let frame = payload_of(&final_chunk(&mut state, Some(Usage::new(10, 3))));

        assert_eq!(frame["choices"][0]["finish_reason"], "stop");
        assert_eq!(frame["usage"]["total_tokens"], 13);
    }

    #[test]
    fn done_frame_is_exactly_the_sentinel() {
        assert_eq!(done_frame(), "data: [DONE]\n\n");
    }

    #[test]
    fn error_frame_is_self_describing() {
        let frame = error_frame(&ProxyError::Stream("connection reset".to_string()));
        let payload = payload_of(&frame);

        assert!(payload["error"]["message"]
            .as_str()
            .unwrap()
            .contains("connection reset"));
        assert_eq!(payload["error"]["code"], "stream_error");
        assert_eq!(payload["error"]["type"], "api_error");
    }
}
