//! # Streamgate - Streaming LLM Gateway
//!
//! An OpenAI-compatible HTTP gateway that forwards chat completion requests
//! to heterogeneous model backends and relays their responses - including
//! live token streams - back to the caller in a provider-agnostic wire
//! format.
//!
//! ## Features
//!
//! - **OpenAI-Compatible API**: drop-in `/v1/chat/completions` endpoint
//! - **Heterogeneous Backends**: OpenAI-style SSE servers and Ollama-style
//!   NDJSON servers behind one client-facing protocol
//! - **Chunk-Safe Streaming**: incremental UTF-8 decoding and frame
//!   reassembly that tolerate arbitrary network chunk boundaries
//! - **Exactly-Once Termination**: the client sees `[DONE]` if and only if
//!   the upstream stream completed successfully
//! - **Bounded Connect Retries**: exponential backoff on upstream rate
//!   limiting, never after response bytes have started flowing
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use streamgate::{AppState, Config, create_router};
//! use std::net::SocketAddr;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::for_test(); // or Config::parse_args() for CLI
//!     let state = AppState::new(config).await;
//!     let app = create_router(state);
//!
//!     let addr = SocketAddr::from(([0, 0, 0, 0], 8080));
//!     let listener = tokio::net::TcpListener::bind(addr).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`config`] - Configuration from CLI arguments and environment
//! - [`adapters`] - Backend adapters (OpenAI-compatible, Ollama, generic)
//! - [`stream`] - The streaming relay pipeline: decode, frame, parse, relay
//! - [`connector`] - Upstream connection with bounded retry on rate limits
//! - [`sanitize`] - Outbound message hygiene
//! - [`schemas`] - Request/response data structures
//! - [`error`] - Crate-wide error type with stable machine codes

// Core infrastructure
pub mod core;
pub mod config;
pub mod error;
pub mod schemas;

// Request-side boundary checks
pub mod access;
pub mod sanitize;

// Upstream communication
pub mod adapters;
pub mod connector;

// The streaming pipeline
pub mod stream;

#[cfg(feature = "server")]
pub mod server;

// Re-export commonly used types for convenience
pub use config::Config;
pub use error::ProxyError;
pub use adapters::{Adapter, AdapterTrait, UpstreamRequest};
pub use connector::{connect, RetryBudget};
pub use sanitize::sanitize_messages;
pub use schemas::{ChatCompletionRequest, Message};
pub use stream::{FrameBuffer, ParsedEvent, Utf8Decoder, WireFormat};
pub use crate::core::http_client::{HttpClientBuilder, HttpClientConfig};

// Server re-exports (feature-gated)
#[cfg(feature = "server")]
pub use server::{create_router, AppState};

/// The result type used throughout the library
pub type Result<T> = std::result::Result<T, ProxyError>;
