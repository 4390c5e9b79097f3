//! # Outbound Message Hygiene
//!
//! Some clients round-trip entire response objects back into conversation
//! history, which drags provider-internal bookkeeping fields (`done`,
//! `eval_count`, ...) into the next request. Those keys are stripped from
//! every outbound message before it reaches an upstream provider; all other
//! fields, including unknown provider-specific extensions, pass through
//! untouched. This is a boundary cleanup, not schema validation - nothing
//! is ever rejected here.

use crate::schemas::Message;
use tracing::debug;

/// Keys that never belong in a conversation message. These are stream
/// bookkeeping fields from NDJSON terminal records that contaminate client
/// state when a response object is replayed as history.
pub const DENIED_MESSAGE_KEYS: [&str; 8] = [
    "done",
    "done_reason",
    "total_duration",
    "load_duration",
    "prompt_eval_count",
    "prompt_eval_duration",
    "eval_count",
    "eval_duration",
];

/// Strip deny-listed keys from every message in place.
///
/// Returns the number of keys removed. Idempotent: a second pass over the
/// same messages removes nothing.
pub fn sanitize_messages(messages: &mut [Message]) -> usize {
    let mut removed = 0;
    for message in messages.iter_mut() {
        for key in DENIED_MESSAGE_KEYS {
            if message.extra.remove(key).is_some() {
                removed += 1;
                debug!(role = %message.role, key, "stripped internal field from outbound message");
            }
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message_from(value: serde_json::Value) -> Message {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn strips_done_marker_from_replayed_response() {
        let mut messages = vec![message_from(json!({
            "role": "assistant",
            "content": "",
            "done": false,
        }))];

        let removed = sanitize_messages(&mut messages);

        assert_eq!(removed, 1);
        assert!(messages[0].extra.is_empty());
        assert_eq!(
            serde_json::to_value(&messages[0]).unwrap(),
            json!({"role": "assistant", "content": ""})
        );
    }

    #[test]
    fn strips_all_bookkeeping_fields() {
        let mut messages = vec![message_from(json!({
            "role": "assistant",
            "content": "hello",
            "done": true,
            "done_reason": "stop",
            "eval_count": 42,
            "prompt_eval_count": 7,
            "total_duration": 123456,
        }))];

        let removed = sanitize_messages(&mut messages);
        assert_eq!(removed, 5);
        assert!(messages[0].extra.is_empty());
    }

    #[test]
    fn preserves_unknown_provider_extensions() {
        let mut messages = vec![message_from(json!({
            "role": "user",
            "content": "hi",
            "cache_control": {"type": "ephemeral"},
            "tool_call_id": "call_1",
        }))];

        sanitize_messages(&mut messages);

        assert_eq!(messages[0].extra.len(), 2);
        assert!(messages[0].extra.contains_key("cache_control"));
        assert!(messages[0].extra.contains_key("tool_call_id"));
    }

    #[test]
    fn is_idempotent() {
        let mut messages = vec![message_from(json!({
            "role": "assistant",
            "content": "x",
            "done": false,
            "custom": 1,
        }))];

        let first = sanitize_messages(&mut messages);
        let snapshot = serde_json::to_value(&messages).unwrap();
        let second = sanitize_messages(&mut messages);

        assert_eq!(first, 1);
        assert_eq!(second, 0);
        assert_eq!(serde_json::to_value(&messages).unwrap(), snapshot);
    }

    #[test]
    fn empty_message_list_is_a_no_op() {
        let mut messages: Vec<Message> = Vec::new();
        assert_eq!(sanitize_messages(&mut messages), 0);
    }
}
