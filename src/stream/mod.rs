//! # Streaming Pipeline
//!
//! The subsystem that turns a raw, arbitrarily-chunked upstream byte stream
//! into a correctly framed, UTF-8-safe client stream:
//!
//! - [`decode`] - incremental UTF-8 decoding across chunk boundaries
//! - [`frame`] - wire format detection and frame reassembly
//! - [`parse`] - frame to structured event parsing
//! - [`core`] - client-facing SSE frame construction
//! - [`relay`] - the per-request state machine driving it all

pub mod core;
pub mod decode;
pub mod frame;
pub mod parse;

#[cfg(feature = "server")]
pub mod relay;

// Re-export the pipeline's main types
pub use self::core::StreamingState;
pub use decode::Utf8Decoder;
pub use frame::{detect_format, FrameBuffer, WireFormat};
pub use parse::{parse_frame, ParsedEvent};

#[cfg(feature = "server")]
pub use relay::{relay_response, StreamRelay, StreamState};
