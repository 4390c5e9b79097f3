//! # Backend Adapters Module
//!
//! Adapters translate between the gateway's OpenAI-compatible surface and
//! each backend's native request shape:
//!
//! - **OpenAI**: OpenAI and compatible servers (vLLM, LiteLLM, ...)
//! - **Ollama**: local-model servers speaking NDJSON on `/api/chat`
//! - **Compat**: any other OpenAI-compatible endpoint
//!
//! Adapters only prepare requests and convert non-streaming responses.
//! Response framing is deliberately not their concern: the relay pipeline
//! detects SSE vs NDJSON from the bytes themselves, so a backend that
//! switches framing does not need a new adapter.

use crate::{config::Config, connector::RetryBudget, error::ProxyError, schemas::ChatCompletionRequest};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

pub mod base;
pub mod compat;
pub mod ollama;
pub mod openai;

pub use base::{AdapterTrait, UpstreamRequest};
pub use compat::CompatAdapter;
pub use ollama::OllamaAdapter;
pub use openai::OpenAiAdapter;

/// The configured backend adapter.
#[derive(Clone, Debug)]
pub enum Adapter {
    OpenAi(OpenAiAdapter),
    Ollama(OllamaAdapter),
    Compat(CompatAdapter),
}

impl Adapter {
    /// Select an adapter from configuration. An explicit `backend_type`
    /// wins; `auto` falls back to URL pattern detection.
    pub fn from_config(cfg: &Config) -> Self {
        let base = cfg.backend_url.clone();
        let model = cfg.model_id.clone();
        let token = cfg.backend_token.clone();

        match cfg.backend_type.as_str() {
            "openai" => Self::OpenAi(OpenAiAdapter::new(base, model, token)),
            "ollama" => Self::Ollama(OllamaAdapter::new(base, model, token)),
            "compat" => Self::Compat(CompatAdapter::new(base, model, token)),
            _ => {
                if base.contains("11434") || base.contains("ollama") {
                    Self::Ollama(OllamaAdapter::new(base, model, token))
                } else if base.contains("openai.com") || base.contains("/v1") {
                    Self::OpenAi(OpenAiAdapter::new(base, model, token))
                } else {
                    Self::Compat(CompatAdapter::new(base, model, token))
                }
            }
        }
    }

    fn inner(&self) -> &dyn AdapterTrait {
        match self {
            Self::OpenAi(adapter) => adapter,
            Self::Ollama(adapter) => adapter,
            Self::Compat(adapter) => adapter,
        }
    }

    pub fn name(&self) -> &'static str {
        self.inner().name()
    }

    pub fn base_url(&self) -> &str {
        self.inner().base_url()
    }

    pub fn model_id(&self) -> &str {
        self.inner().model_id()
    }

    pub fn has_auth(&self) -> bool {
        self.inner().has_auth()
    }

    pub fn build_chat_request(
        &self,
        request: &ChatCompletionRequest,
        stream: bool,
    ) -> Result<UpstreamRequest, ProxyError> {
        self.inner().build_chat_request(request, stream)
    }

    pub async fn chat_completions(
        &self,
        client: &Client,
        request: &ChatCompletionRequest,
        budget: RetryBudget,
        timeout: Duration,
    ) -> Result<Value, ProxyError> {
        self.inner()
            .chat_completions(client, request, budget, timeout)
            .await
    }
}
