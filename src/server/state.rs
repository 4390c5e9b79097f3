//! # Application State
//!
//! Shared state handed to every HTTP handler: configuration, the selected
//! backend adapter, the access check, and the pooled HTTP client. The
//! client pool is the only resource shared between concurrent requests;
//! all streaming state is created per request.

use crate::{
    access::ModelAccess,
    adapters::Adapter,
    config::Config,
    connector::RetryBudget,
    core::http_client::HttpClientBuilder,
};
use std::time::Duration;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub adapter: Adapter,
    pub access: ModelAccess,
    pub http_client: reqwest::Client,
}

impl AppState {
    pub async fn new(config: Config) -> Self {
        let adapter = Adapter::from_config(&config);
        let access = ModelAccess::from_config(&config);

        let http_client = HttpClientBuilder::from_config(&config)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            config,
            adapter,
            access,
            http_client,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    pub fn retry_budget(&self) -> RetryBudget {
        RetryBudget::from_config(&self.config)
    }

    /// Deadline for non-streaming upstream round trips.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.http_client_timeout)
    }
}
