//! # Generic Compatible Adapter
//!
//! Fallback adapter for any endpoint that speaks the OpenAI chat protocol
//! but matches none of the known backend patterns. Behaves like the OpenAI
//! adapter with a configurable path convention.

use crate::{
    adapters::base::{extract_model, send_json, AdapterTrait, UpstreamRequest},
    connector::RetryBudget,
    error::ProxyError,
    schemas::ChatCompletionRequest,
};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct CompatAdapter {
    base: String,
    model_id: String,
    token: Option<String>,
}

impl CompatAdapter {
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
impl AdapterTrait for CompatAdapter {
    fn name(&self) -> &'static str {
        "compat"
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
        let upstream = self.build_chat_request(request, false)?;
        send_json(&upstream, client, budget, timeout).await
    }
}
