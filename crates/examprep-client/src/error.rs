//! Mapping from HTTP failures to [`GatewayError`], plus auth errors.

use reqwest::{Response, StatusCode};
use serde::Deserialize;
use thiserror::Error;

use examprep_core::error::GatewayError;
use examprep_core::validation::ValidationError;

/// Error body the API sends: `{statusCode, message, error?}`. `message` may
/// be a list of field messages.
#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

fn extract_message(body: &str) -> String {
    let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body) else {
        return body.trim().to_string();
    };
    match parsed.message {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join("; "),
        _ => parsed.error.unwrap_or_default(),
    }
}

/// Turn a transport error into a gateway error.
pub(crate) fn from_reqwest(e: reqwest::Error, timeout_secs: u64) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout(timeout_secs)
    } else if e.is_decode() {
        GatewayError::Decode(e.to_string())
    } else {
        GatewayError::Network(e.to_string())
    }
}

/// Pass successful responses through; classify the rest.
pub(crate) async fn check_status(response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = extract_message(&body);
    Err(match status {
        StatusCode::UNAUTHORIZED => GatewayError::Unauthorized(message),
        StatusCode::NOT_FOUND | StatusCode::FORBIDDEN => GatewayError::NotFound(message),
        _ => GatewayError::Api {
            status: status.as_u16(),
            message,
        },
    })
}

/// Errors from the auth context.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("failed to persist token: {0}")]
    Storage(#[from] std::io::Error),
}

impl AuthError {
    /// Text suitable for a user-facing notification.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Validation(e) => e
                .0
                .iter()
                .map(|f| f.message.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
            AuthError::Gateway(e) => e.user_message(),
            AuthError::Storage(e) => e.to_string(),
        }
    }
}
