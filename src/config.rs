//! # Streamgate Configuration
//!
//! Configuration from command-line arguments, environment variables, and an
//! optional `.env` file. All knobs the streaming pipeline and the connect
//! retry budget depend on live here, read once per process.

#[cfg(feature = "cli")]
use clap::Parser;
use url::Url;

#[derive(Debug, Clone)]
#[cfg_attr(feature = "cli", derive(Parser))]
#[cfg_attr(feature = "cli", command(name = "streamgate"))]
#[cfg_attr(feature = "cli", command(about = "An OpenAI-compatible gateway that relays chat completions, including live token streams, to heterogeneous LLM backends"))]
#[cfg_attr(feature = "cli", command(version))]
pub struct Config {
    /// Server port to listen on
    #[cfg_attr(feature = "cli", arg(short, long, env = "PORT", default_value = "8080"))]
    pub port: u16,

    /// Server host to bind to
    #[cfg_attr(feature = "cli", arg(long, env = "HOST", default_value = "0.0.0.0"))]
    pub host: String,

    /// Backend base URL (OpenAI-compatible server, Ollama, or any
    /// compatible endpoint)
    #[cfg_attr(feature = "cli", arg(long, env = "STREAMGATE_BACKEND_URL", default_value = "http://localhost:11434"))]
    pub backend_url: String,

    /// Backend type: auto, openai, ollama, compat
    #[cfg_attr(feature = "cli", arg(long, env = "STREAMGATE_BACKEND_TYPE", default_value = "auto"))]
    pub backend_type: String,

    /// Default model ID used when the request does not name one
    #[cfg_attr(feature = "cli", arg(long, env = "STREAMGATE_MODEL", default_value = "llama3"))]
    pub model_id: String,

    /// Authentication token for the backend
    #[cfg_attr(feature = "cli", arg(long, env = "STREAMGATE_TOKEN"))]
    pub backend_token: Option<String>,

    /// Comma-separated list of models clients may request; unset = allow all
    #[cfg_attr(feature = "cli", arg(long, env = "STREAMGATE_ALLOWED_MODELS"))]
    pub allowed_models: Option<String>,

    /// Non-streaming request timeout in seconds
    #[cfg_attr(feature = "cli", arg(long, env = "HTTP_CLIENT_TIMEOUT", default_value = "30"))]
    pub http_client_timeout: u64,

    /// TCP connect timeout in seconds
    #[cfg_attr(feature = "cli", arg(long, env = "HTTP_CLIENT_CONNECT_TIMEOUT", default_value = "10"))]
    pub http_client_connect_timeout: u64,

    /// Maximum idle connections kept per backend host
    #[cfg_attr(feature = "cli", arg(long, env = "HTTP_CLIENT_MAX_IDLE_PER_HOST", default_value = "10"))]
    pub http_client_max_idle_per_host: usize,

    /// Maximum silence between streamed chunks before the stream is
    /// considered dead, in seconds
    #[cfg_attr(feature = "cli", arg(long, env = "STREAMING_READ_TIMEOUT", default_value = "300"))]
    pub streaming_read_timeout: u64,

    /// Maximum connection attempts when the backend answers 429
    #[cfg_attr(feature = "cli", arg(long, env = "CONNECT_MAX_ATTEMPTS", default_value = "4"))]
    pub connect_max_attempts: u32,

    /// Base backoff delay between connection attempts, in milliseconds
    #[cfg_attr(feature = "cli", arg(long, env = "CONNECT_BASE_DELAY_MS", default_value = "250"))]
    pub connect_base_delay_ms: u64,

    /// Backoff delay ceiling, in milliseconds
    #[cfg_attr(feature = "cli", arg(long, env = "CONNECT_MAX_DELAY_MS", default_value = "8000"))]
    pub connect_max_delay_ms: u64,

    /// Log level (error, warn, info, debug, trace)
    #[cfg_attr(feature = "cli", arg(long, env = "RUST_LOG", default_value = "info"))]
    pub log_level: String,

    /// CORS origin (use * for development only)
    #[cfg_attr(feature = "cli", arg(long, env = "CORS_ORIGIN", default_value = "*"))]
    pub cors_origin: String,

    /// Environment (development, staging, production)
    #[cfg_attr(feature = "cli", arg(long, env = "ENVIRONMENT", default_value = "development"))]
    pub environment: String,
}

impl Config {
    /// Parse configuration from command line arguments and environment
    /// variables, loading `.env` first if present, then set up logging and
    /// validate. Exits with an error message on invalid configuration.
    #[cfg(feature = "cli")]
    pub fn parse_args() -> Self {
        let _ = dotenv::dotenv();

        let config = Self::parse();

        config.setup_logging();

        if let Err(err) = config.validate() {
            eprintln!("configuration validation failed: {}", err);
            std::process::exit(1);
        }

        config
    }

    /// Minimal configuration for tests.
    pub fn for_test() -> Self {
        Self {
            port: 8080,
            host: "127.0.0.1".to_string(),
            backend_url: "http://localhost:11434".to_string(),
            backend_type: "auto".to_string(),
            model_id: "llama3".to_string(),
            backend_token: None,
            allowed_models: None,
            http_client_timeout: 30,
            http_client_connect_timeout: 10,
            http_client_max_idle_per_host: 10,
            streaming_read_timeout: 300,
            connect_max_attempts: 4,
            connect_base_delay_ms: 10,
            connect_max_delay_ms: 100,
            log_level: "info".to_string(),
            cors_origin: "*".to_string(),
            environment: "development".to_string(),
        }
    }

    #[cfg(feature = "cli")]
    fn setup_logging(&self) {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(&self.log_level)
            .with_target(false)
            .try_init();
    }

    /// Validate configuration values. Hard failures return `Err`; dubious
    /// but workable values only warn on stderr.
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("port cannot be 0".to_string());
        }

        if self.host.is_empty() {
            return Err("host cannot be empty".to_string());
        }

        match Url::parse(&self.backend_url) {
            Ok(url) => {
                if !["http", "https"].contains(&url.scheme()) {
                    return Err(format!(
                        "invalid backend URL scheme '{}', only http and https are supported",
                        url.scheme()
                    ));
                }
                if url.host().is_none() {
                    return Err("backend URL must include a host".to_string());
                }
                if self.environment == "production" && url.scheme() == "http" {
                    eprintln!("warning: plain HTTP backend URL in production");
                }
            }
            Err(err) => {
                return Err(format!(
                    "invalid backend URL '{}': {}",
                    self.backend_url, err
                ));
            }
        }

        if self.model_id.is_empty() {
            return Err("model ID cannot be empty".to_string());
        }

        let valid_backend_types = ["auto", "openai", "ollama", "compat"];
        if !valid_backend_types.contains(&self.backend_type.as_str()) {
            return Err(format!(
                "invalid backend type '{}', valid options are: {}",
                self.backend_type,
                valid_backend_types.join(", ")
            ));
        }

        if self.connect_max_attempts == 0 {
            return Err("connect max attempts must be at least 1".to_string());
        }
        if self.connect_base_delay_ms > self.connect_max_delay_ms {
            eprintln!(
                "warning: connect base delay ({}ms) exceeds the delay ceiling ({}ms)",
                self.connect_base_delay_ms, self.connect_max_delay_ms
            );
        }

        if self.http_client_timeout == 0 {
            return Err("HTTP client timeout must be greater than 0 seconds".to_string());
        }
        if self.streaming_read_timeout == 0 {
            return Err("streaming read timeout must be greater than 0 seconds".to_string());
        }

        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels
            .iter()
            .any(|level| self.log_level.starts_with(level) || self.log_level.contains('='))
        {
            return Err(format!("invalid log level '{}'", self.log_level));
        }

        if self.environment == "production" && self.cors_origin == "*" {
            eprintln!("warning: permissive CORS origin '*' in production");
        }

        Ok(())
    }
}
