//! # Stream Relay
//!
//! The state machine that drives one streaming response from upstream bytes
//! to the client sink. Each inbound chunk runs decode → buffer → detect →
//! parse → act; the relay decides when the terminal `[DONE]` may be sent
//! and converts any mid-stream failure into a single in-band error frame.
//!
//! Termination invariant: the client sees `data: [DONE]` exactly once, only
//! when the upstream stream actually completed, and never after an error
//! frame has been emitted.

use crate::{
    error::ProxyError,
    schemas::Usage,
    stream::{
        core::{
            content_chunk, done_frame, error_frame, final_chunk, sse_data_frame, StreamingState,
        },
        decode::Utf8Decoder,
        frame::{detect_format, FrameBuffer, WireFormat},
        parse::{parse_frame, ParsedEvent},
    },
};
use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

/// Frames buffered toward a slow client before upstream reads pause.
const CLIENT_CHANNEL_CAPACITY: usize = 16;

/// Lifecycle of one relayed stream. `Erred` and `Done` are terminal: once
/// either is reached no further upstream bytes are processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Streaming,
    Erred,
    Done,
}

/// Per-request relay. Owns every piece of mutable stream state; nothing
/// here is shared between requests.
pub struct StreamRelay {
    state: StreamState,
    decoder: Utf8Decoder,
    buffer: FrameBuffer,
    format: WireFormat,
    chunks: StreamingState,
    /// Whether a usage-bearing terminal record already closed the message
    /// (NDJSON streams close the message before the transport ends).
    message_closed: bool,
}

impl StreamRelay {
    pub fn new(model: String) -> Self {
        Self {
            state: StreamState::Streaming,
            decoder: Utf8Decoder::new(),
            buffer: FrameBuffer::new(),
            format: WireFormat::Unknown,
            chunks: StreamingState::new(model),
            message_closed: false,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Drive the whole stream: read upstream chunks until a terminal state
    /// is reached, the upstream closes, or the client goes away. Dropping
    /// the body stream on return releases the upstream connection, so no
    /// work continues after cancellation.
    pub async fn run(mut self, upstream: reqwest::Response, tx: mpsc::Sender<Bytes>) {
        let mut body = upstream.bytes_stream();

        while self.state == StreamState::Streaming {
            match body.next().await {
                Some(Ok(chunk)) => {
                    let text = self.decoder.decode(&chunk);
                    if !self.process_text(&text, &tx).await {
                        break;
                    }
                }
                Some(Err(err)) => {
                    self.fail(
                        ProxyError::Stream(format!("upstream read failed: {}", err)),
                        &tx,
                    )
                    .await;
                    break;
                }
                None => {
                    self.finish(&tx).await;
                    break;
                }
            }
        }

        debug!(
            state = ?self.state,
            bytes = self.decoder.bytes_processed(),
            format = self.format.as_str(),
            "stream relay finished"
        );
    }

    /// Feed decoded text through buffer → parse → act. Returns `false` when
    /// processing must stop: terminal state reached or client disconnected.
    async fn process_text(&mut self, text: &str, tx: &mpsc::Sender<Bytes>) -> bool {
        self.buffer.append(text);

        if self.format == WireFormat::Unknown {
            self.format = detect_format(self.buffer.sample(), false);
            if self.format == WireFormat::Unknown {
                // Inconclusive prefix; wait for more bytes.
                return true;
            }
            debug!(format = self.format.as_str(), "detected upstream wire format");
        }

        let frames = self.buffer.extract(self.format, false);
        self.process_frames(frames, tx).await
    }

    async fn process_frames(&mut self, frames: Vec<String>, tx: &mpsc::Sender<Bytes>) -> bool {
        for frame in frames {
            if self.state != StreamState::Streaming {
                // A terminal frame earlier in this batch wins; the rest of
                // the chunk is not processed.
                return false;
            }
            match parse_frame(&frame, self.format) {
                Err(err) => {
                    self.fail(err, tx).await;
                    return false;
                }
                Ok(None) => continue,
                Ok(Some(event)) => {
                    if !self.act(event, tx).await {
                        return false;
                    }
                }
            }
        }
        self.state == StreamState::Streaming
    }

    /// Apply one parsed event. Returns `false` when the stream must stop.
    async fn act(&mut self, event: ParsedEvent, tx: &mpsc::Sender<Bytes>) -> bool {
        match event {
            ParsedEvent::ContentDelta { text, raw } => {
                let frame = match self.format {
                    // SSE upstreams already speak the client protocol:
                    // forward the original payload untouched.
                    WireFormat::Sse => sse_data_frame(&raw),
                    _ => content_chunk(&mut self.chunks, &text),
                };
                self.send(frame, tx).await
            }
            ParsedEvent::Passthrough { raw } => self.send(sse_data_frame(&raw), tx).await,
            ParsedEvent::Usage {
                prompt_tokens,
                completion_tokens,
            } => {
                self.message_closed = true;
                let usage = Usage::new(prompt_tokens, completion_tokens);
                let frame = match self.format {
                    WireFormat::Sse => return true,
                    _ => final_chunk(&mut self.chunks, Some(usage)),
                };
                self.send(frame, tx).await
            }
            ParsedEvent::StreamEnd => {
                self.state = StreamState::Done;
                self.send(done_frame(), tx).await;
                false
            }
            ParsedEvent::Unparseable { raw } => {
                warn!(
                    format = self.format.as_str(),
                    frame = %raw.chars().take(120).collect::<String>(),
                    "skipping unparseable stream frame"
                );
                true
            }
        }
    }

    /// Clean upstream close. Flushes the decoder and buffer, then treats
    /// the close as implicit success when no error and no explicit end
    /// sentinel occurred (some providers just close the socket).
    async fn finish(&mut self, tx: &mpsc::Sender<Bytes>) {
        if self.state != StreamState::Streaming {
            return;
        }

        let tail = self.decoder.finish();
        self.buffer.append(&tail);
        if self.format == WireFormat::Unknown {
            self.format = detect_format(self.buffer.sample(), true);
        }
        let frames = self.buffer.extract(self.format, true);
        if !self.process_frames(frames, tx).await {
            return;
        }

        if self.format == WireFormat::Ndjson && self.chunks.chunk_index > 0 && !self.message_closed
        {
            // The message never got a terminal record; close it before the
            // wire-level terminator so clients see a finish_reason.
            let frame = final_chunk(&mut self.chunks, None);
            if !self.send(frame, tx).await {
                return;
            }
        }

        self.state = StreamState::Done;
        let _ = tx.send(Bytes::from(done_frame())).await;
    }

    /// Transition to `Erred` and emit the single in-band error frame. A
    /// second failure after the first is ignored; `Erred` is terminal.
    async fn fail(&mut self, err: ProxyError, tx: &mpsc::Sender<Bytes>) {
        if self.state != StreamState::Streaming {
            return;
        }
        self.state = StreamState::Erred;
        warn!(code = err.code(), error = %err, "stream failed, emitting error frame");
        let _ = tx.send(Bytes::from(error_frame(&err))).await;
    }

    /// Hand one frame to the client sink. Blocks while the client is slow
    /// (backpressure: the next upstream read waits on this). Returns
    /// `false` when the client has disconnected.
    async fn send(&mut self, frame: String, tx: &mpsc::Sender<Bytes>) -> bool {
        if tx.send(Bytes::from(frame)).await.is_err() {
            debug!("client disconnected, stopping upstream reads");
            return false;
        }
        true
    }
}

/// Spawn a relay for an upstream response and return the client-facing SSE
/// response backed by it.
pub fn relay_response(upstream: reqwest::Response, model: String) -> Response {
    let (tx, rx) = mpsc::channel::<Bytes>(CLIENT_CHANNEL_CAPACITY);

    let relay = StreamRelay::new(model);
    tokio::spawn(relay.run(upstream, tx));

    let body = Body::from_stream(ReceiverStream::new(rx).map(Ok::<Bytes, std::convert::Infallible>));
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
