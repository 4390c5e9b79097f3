//! # Frame Parsing
//!
//! Turns one complete wire frame into a structured [`ParsedEvent`]. The
//! parser is deliberately forgiving: a single malformed frame is reported
//! as [`ParsedEvent::Unparseable`] and never terminates the stream, while
//! an upstream error payload is routed out through `Err` so the relay can
//! switch to its error path.

use crate::error::ProxyError;
use crate::stream::frame::WireFormat;
use serde_json::Value;

/// SSE payload that terminates the stream.
const DONE_SENTINEL: &str = "[DONE]";

/// One structured event parsed from a wire frame. Consumed immediately by
/// the relay, never persisted and never serialized back into any message.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedEvent {
    /// A token of assistant output. `raw` is the original payload, kept so
    /// passthrough forwarding can ship the exact upstream bytes.
    ContentDelta { text: String, raw: String },
    /// A usage-bearing terminal record (NDJSON `done: true`). Ends the
    /// message, but not the transport: the wire-level end is the upstream
    /// close.
    Usage {
        prompt_tokens: u32,
        completion_tokens: u32,
    },
    /// Explicit wire-level end sentinel (`data: [DONE]`)
    StreamEnd,
    /// Valid JSON the gateway does not model; forwarded unmodified
    Passthrough { raw: String },
    /// A frame that failed to parse. Recoverable: logged and skipped.
    Unparseable { raw: String },
}

/// Parse one frame under the stream's detected framing.
///
/// Returns `Ok(None)` for frames with nothing to act on (comment-only or
/// whitespace-only events), and `Err` when the frame carries an upstream
/// error payload.
pub fn parse_frame(frame: &str, format: WireFormat) -> Result<Option<ParsedEvent>, ProxyError> {
    match format {
        WireFormat::Sse => parse_sse_frame(frame),
        // An undetected stream that still reached the parser is treated as
        // line framing, the more permissive of the two.
        WireFormat::Ndjson | WireFormat::Unknown => parse_ndjson_line(frame),
    }
}

fn parse_sse_frame(frame: &str) -> Result<Option<ParsedEvent>, ProxyError> {
    let mut event_tag: Option<&str> = None;
    let mut data_lines: Vec<&str> = Vec::new();

    for line in frame.lines() {
        let line = line.trim_end_matches('\r');
        if line.starts_with(':') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("event:") {
            event_tag = Some(rest.trim());
            continue;
        }
        if let Some(rest) = line.strip_prefix("data:") {
            // The payload is whatever follows the field name; provider
            // whitespace after the colon varies, so trim rather than
            // slicing at a fixed offset.
            data_lines.push(rest.trim_start());
            continue;
        }
        // id:, retry:, and unknown fields carry nothing we act on.
    }

    if data_lines.is_empty() {
        return Ok(None);
    }

    let payload = data_lines.join("\n");
    let trimmed = payload.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    if trimmed == DONE_SENTINEL {
        return Ok(Some(ParsedEvent::StreamEnd));
    }

    let value: Value = match serde_json::from_str(trimmed) {
        Ok(value) => value,
        Err(_) => return Ok(Some(ParsedEvent::Unparseable { raw: payload })),
    };

    if let Some(error) = value.get("error") {
        return Err(upstream_error(error));
    }
    if event_tag == Some("error") {
        return Err(ProxyError::Upstream(trimmed.to_string()));
    }

    match sse_delta_text(&value) {
        Some(text) => Ok(Some(ParsedEvent::ContentDelta { text, raw: payload })),
        None => Ok(Some(ParsedEvent::Passthrough { raw: payload })),
    }
}

fn parse_ndjson_line(line: &str) -> Result<Option<ParsedEvent>, ProxyError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let value: Value = match serde_json::from_str(trimmed) {
        Ok(value) => value,
        Err(_) => {
            return Ok(Some(ParsedEvent::Unparseable {
                raw: line.to_string(),
            }))
        }
    };

    if let Some(error) = value.get("error") {
        return Err(upstream_error(error));
    }

    if value.get("done").and_then(Value::as_bool) == Some(true) {
        let prompt_tokens = value
            .get("prompt_eval_count")
            .and_then(Value::as_u64)
            .unwrap_or(0) as u32;
        let completion_tokens = value.get("eval_count").and_then(Value::as_u64).unwrap_or(0) as u32;
        return Ok(Some(ParsedEvent::Usage {
            prompt_tokens,
            completion_tokens,
        }));
    }

    match ndjson_content(&value) {
        Some(text) => Ok(Some(ParsedEvent::ContentDelta {
            text,
            raw: line.to_string(),
        })),
        None => Ok(Some(ParsedEvent::Passthrough {
            raw: line.to_string(),
        })),
    }
}

/// Content of an OpenAI streaming chunk, if present.
fn sse_delta_text(value: &Value) -> Option<String> {
    value
        .get("choices")?
        .get(0)?
        .get("delta")?
        .get("content")?
        .as_str()
        .map(str::to_string)
}

/// Content of an NDJSON record: Ollama chat (`message.content`), OpenAI
/// chunk shape, or Ollama generate (`response`), in that order.
fn ndjson_content(value: &Value) -> Option<String> {
    if let Some(text) = value
        .get("message")
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
    {
        return Some(text.to_string());
    }
    if let Some(text) = sse_delta_text(value) {
        return Some(text);
    }
    value
        .get("response")
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn upstream_error(error: &Value) -> ProxyError {
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string());
    ProxyError::Upstream(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sse(frame: &str) -> Result<Option<ParsedEvent>, ProxyError> {
        parse_frame(frame, WireFormat::Sse)
    }

    fn ndjson(line: &str) -> Result<Option<ParsedEvent>, ProxyError> {
        parse_frame(line, WireFormat::Ndjson)
    }

    #[test]
    fn sse_content_delta() {
        let frame = r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#;
        match sse(frame).unwrap().unwrap() {
            ParsedEvent::ContentDelta { text, raw } => {
                assert_eq!(text, "Hel");
                assert_eq!(raw, r#"{"choices":[{"delta":{"content":"Hel"}}]}"#);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn sse_done_sentinel() {
        assert_eq!(sse("data: [DONE]").unwrap(), Some(ParsedEvent::StreamEnd));
        // Whitespace after the field name varies by provider.
        assert_eq!(sse("data:[DONE]").unwrap(), Some(ParsedEvent::StreamEnd));
        assert_eq!(sse("data:  [DONE] ").unwrap(), Some(ParsedEvent::StreamEnd));
    }

    #[test]
    fn sse_done_sentinel_is_case_sensitive() {
        match sse("data: [done]").unwrap().unwrap() {
            ParsedEvent::Unparseable { .. } => {}
            other => panic!("lowercase sentinel must not end the stream: {other:?}"),
        }
    }

    #[test]
    fn sse_comment_only_frame_is_a_no_op() {
        assert_eq!(sse(": keep-alive").unwrap(), None);
        assert_eq!(sse(":\n: another comment").unwrap(), None);
    }

    #[test]
    fn sse_malformed_json_is_recoverable() {
        match sse("data: {broken").unwrap().unwrap() {
            ParsedEvent::Unparseable { raw } => assert_eq!(raw, "{broken"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn sse_error_payload_routes_to_error_path() {
        let frame = r#"data: {"error":{"message":"model overloaded","code":"overloaded"}}"#;
        let err = sse(frame).unwrap_err();
        assert!(err.to_string().contains("model overloaded"));
    }

    #[test]
    fn sse_error_event_tag_routes_to_error_path() {
        let frame = "event: error\ndata: {\"status\":\"failed\"}";
        assert!(sse(frame).is_err());
    }

    #[test]
    fn sse_role_only_chunk_is_passthrough() {
        let frame = r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#;
        match sse(frame).unwrap().unwrap() {
            ParsedEvent::Passthrough { raw } => assert!(raw.contains("assistant")),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn sse_multiple_data_lines_join_with_newline() {
        let frame = "data: {\"choices\":[{\"delta\":\ndata: {\"content\":\"x\"}}]}";
        match sse(frame).unwrap().unwrap() {
            // Joined payload is valid JSON spread over two data lines.
            ParsedEvent::ContentDelta { text, .. } => assert_eq!(text, "x"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn ndjson_ollama_content() {
        let line = r#"{"message":{"role":"assistant","content":"hi"},"done":false}"#;
        match ndjson(line).unwrap().unwrap() {
            ParsedEvent::ContentDelta { text, .. } => assert_eq!(text, "hi"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn ndjson_done_record_yields_usage() {
        let line = r#"{"message":{"content":""},"done":true,"prompt_eval_count":11,"eval_count":4}"#;
        match ndjson(line).unwrap().unwrap() {
            ParsedEvent::Usage {
                prompt_tokens,
                completion_tokens,
            } => {
                assert_eq!(prompt_tokens, 11);
                assert_eq!(completion_tokens, 4);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn ndjson_done_record_without_counters() {
        let line = r#"{"done":true}"#;
        assert_eq!(
            ndjson(line).unwrap(),
            Some(ParsedEvent::Usage {
                prompt_tokens: 0,
                completion_tokens: 0,
            })
        );
    }

    #[test]
    fn ndjson_generate_response_field() {
        let line = r#"{"response":"tok","done":false}"#;
        match ndjson(line).unwrap().unwrap() {
            ParsedEvent::ContentDelta { text, .. } => assert_eq!(text, "tok"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn ndjson_error_payload_routes_to_error_path() {
        let line = r#"{"error":{"message":"model not found"}}"#;
        assert!(ndjson(line).is_err());
    }

    #[test]
    fn ndjson_bare_error_string_still_errors() {
        // Ollama reports some errors as {"error": "..."}.
        let line = r#"{"error":"out of memory"}"#;
        let err = ndjson(line).unwrap_err();
        assert!(err.to_string().contains("out of memory"));
    }

    #[test]
    fn ndjson_unknown_json_is_passthrough() {
        let line = r#"{"model":"llama3","created_at":"2026-01-01T00:00:00Z"}"#;
        match ndjson(line).unwrap().unwrap() {
            ParsedEvent::Passthrough { raw } => assert_eq!(raw, line),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn ndjson_garbage_is_recoverable() {
        match ndjson("not json at all").unwrap().unwrap() {
            ParsedEvent::Unparseable { .. } => {}
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn whitespace_only_frames_are_no_ops() {
        assert_eq!(ndjson("   ").unwrap(), None);
        assert_eq!(sse("   ").unwrap(), None);
    }
}
