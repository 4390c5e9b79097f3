//! # Error Types
//!
//! The crate-wide [`ProxyError`] enum. Every client-visible error carries a
//! human-readable message plus a stable machine code, so callers can react
//! programmatically even when the error arrives mid-stream as an in-band
//! frame rather than an HTTP status.

#[cfg(feature = "server")]
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
#[cfg(feature = "server")]
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("model not allowed: {0}")]
    Forbidden(String),

    #[error("upstream error: {0}")]
    Upstream(String),

    /// The upstream answered the connection attempt with a non-success
    /// status other than 429.
    #[error("upstream returned HTTP {status}: {detail}")]
    UpstreamStatus { status: u16, detail: String },

    /// The connect-phase retry budget was exhausted on HTTP 429 responses.
    #[error("upstream rate limited, gave up after {attempts} attempts")]
    RateLimited { attempts: u32 },

    /// A failure observed after response bytes started flowing. These can
    /// only be surfaced in-band, as a single error frame.
    #[error("stream error: {0}")]
    Stream(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ProxyError {
    /// Stable machine-readable code, kept independent of the display text.
    pub fn code(&self) -> &'static str {
        match self {
            ProxyError::BadRequest(_) => "invalid_request",
            ProxyError::Forbidden(_) => "model_not_allowed",
            ProxyError::Upstream(_) => "upstream_error",
            ProxyError::UpstreamStatus { .. } => "upstream_status",
            ProxyError::RateLimited { .. } => "rate_limited",
            ProxyError::Stream(_) => "stream_error",
            ProxyError::Internal(_) => "internal_error",
            ProxyError::Serialization(_) => "serialization_error",
        }
    }

    /// OpenAI-style error `type` field.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::BadRequest(_) | ProxyError::Forbidden(_) => "invalid_request_error",
            ProxyError::RateLimited { .. } => "rate_limit_error",
            ProxyError::Upstream(_) | ProxyError::UpstreamStatus { .. } | ProxyError::Stream(_) => {
                "api_error"
            }
            ProxyError::Internal(_) | ProxyError::Serialization(_) => "internal_error",
        }
    }
}

#[cfg(feature = "server")]
impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = match &self {
            ProxyError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ProxyError::Forbidden(_) => StatusCode::FORBIDDEN,
            ProxyError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ProxyError::Upstream(_)
            | ProxyError::UpstreamStatus { .. }
            | ProxyError::Stream(_) => StatusCode::BAD_GATEWAY,
            ProxyError::Internal(_) | ProxyError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": {
                "message": self.to_string(),
                "type": self.kind(),
                "code": self.code(),
            }
        }));

        (status, body).into_response()
    }
}

impl From<reqwest::Error> for ProxyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProxyError::Upstream("request timeout - backend did not respond in time".to_string())
        } else if err.is_connect() {
            ProxyError::Upstream("connection failed - unable to reach backend".to_string())
        } else if err.is_request() {
            ProxyError::BadRequest(format!("invalid request: {}", err))
        } else if let Some(status) = err.status() {
            ProxyError::UpstreamStatus {
                status: status.as_u16(),
                detail: err.to_string(),
            }
        } else {
            ProxyError::Upstream(format!("HTTP client error: {}", err))
        }
    }
}

impl From<serde_json::Error> for ProxyError {
    fn from(err: serde_json::Error) -> Self {
        ProxyError::Serialization(format!("JSON error: {}", err))
    }
}

impl From<std::io::Error> for ProxyError {
    fn from(err: std::io::Error) -> Self {
        ProxyError::Internal(format!("I/O error: {}", err))
    }
}

impl From<url::ParseError> for ProxyError {
    fn from(err: url::ParseError) -> Self {
        ProxyError::BadRequest(format!("invalid URL: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ProxyError::BadRequest("x".into()).code(), "invalid_request");
        assert_eq!(
            ProxyError::RateLimited { attempts: 3 }.code(),
            "rate_limited"
        );
        assert_eq!(ProxyError::Stream("reset".into()).code(), "stream_error");
    }

    #[test]
    fn kind_maps_to_openai_error_types() {
        assert_eq!(
            ProxyError::Forbidden("gpt-x".into()).kind(),
            "invalid_request_error"
        );
        assert_eq!(
            ProxyError::UpstreamStatus {
                status: 500,
                detail: "boom".into()
            }
            .kind(),
            "api_error"
        );
    }

    #[test]
    fn display_includes_detail() {
        let err = ProxyError::RateLimited { attempts: 4 };
        assert!(err.to_string().contains("4 attempts"));
    }
}
