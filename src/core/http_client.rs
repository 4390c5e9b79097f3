//! # HTTP Client Factory
//!
//! Centralized construction of the pooled `reqwest::Client` shared by all
//! in-flight requests. The pool is the only process-wide shared resource;
//! everything else in the gateway is per-request state.
//!
//! The client carries no overall request timeout: streamed responses stay
//! open for as long as the model generates. Liveness is enforced with a
//! read timeout between chunks instead, and non-streaming calls apply a
//! per-request deadline at the call site.

use crate::config::Config;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

/// HTTP client configuration errors
#[derive(Debug, Error)]
pub enum HttpClientError {
    #[error("failed to build HTTP client: {0}")]
    Build(#[from] reqwest::Error),
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub connect_timeout: Duration,
    /// Maximum silence between response body chunks
    pub read_timeout: Duration,
    pub max_idle_per_host: usize,
    pub keepalive: Option<Duration>,
    pub compression: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(300),
            max_idle_per_host: 10,
            keepalive: Some(Duration::from_secs(60)),
            compression: true,
        }
    }
}

impl From<&Config> for HttpClientConfig {
    fn from(config: &Config) -> Self {
        Self {
            connect_timeout: Duration::from_secs(config.http_client_connect_timeout),
            read_timeout: Duration::from_secs(config.streaming_read_timeout),
            max_idle_per_host: config.http_client_max_idle_per_host,
            keepalive: Some(Duration::from_secs(60)),
            compression: true,
        }
    }
}

/// Builder for the shared HTTP client
pub struct HttpClientBuilder {
    config: HttpClientConfig,
}

impl HttpClientBuilder {
    pub fn new() -> Self {
        Self {
            config: HttpClientConfig::default(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            config: HttpClientConfig::from(config),
        }
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    pub fn compression(mut self, enabled: bool) -> Self {
        self.config.compression = enabled;
        self
    }

    pub fn build(self) -> Result<Client, HttpClientError> {
        let mut builder = Client::builder()
            .connect_timeout(self.config.connect_timeout)
            .read_timeout(self.config.read_timeout)
            .pool_max_idle_per_host(self.config.max_idle_per_host);

        if let Some(keepalive) = self.config.keepalive {
            builder = builder.tcp_keepalive(keepalive);
        }

        if self.config.compression {
            builder = builder.gzip(true).brotli(true);
        }

        builder.build().map_err(HttpClientError::from)
    }
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
