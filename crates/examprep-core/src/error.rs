//! Error types shared by the controller, the shell, and gateway
//! implementations.
//!
//! `GatewayError` lives in core so the shell can classify failures
//! (not-found vs. transient) without string matching.

use thiserror::Error;

use crate::model::SessionMode;

/// Fallback text when the server gave no usable message.
pub const GENERIC_ERROR_MESSAGE: &str = "Ocurrió un error inesperado. Inténtalo de nuevo.";

/// Errors returned by a remote session gateway.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GatewayError {
    /// The resource is unknown or not owned by the caller.
    #[error("not found: {0}")]
    NotFound(String),

    /// The bearer token is missing or was rejected.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    Network(String),

    /// The response body did not match the expected shape.
    #[error("invalid response: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Text suitable for a user-facing notification: the server's message
    /// when it sent one, otherwise a generic fallback.
    pub fn user_message(&self) -> String {
        let message = match self {
            GatewayError::NotFound(m)
            | GatewayError::Unauthorized(m)
            | GatewayError::Api { message: m, .. } => m.trim(),
            GatewayError::Timeout(_) | GatewayError::Network(_) | GatewayError::Decode(_) => "",
        };
        if message.is_empty() {
            GENERIC_ERROR_MESSAGE.to_string()
        } else {
            message.to_string()
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound(_))
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, GatewayError::Unauthorized(_))
    }
}

/// Errors from the session state controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The session or its question list is empty.
    #[error("session not found or has no questions")]
    NotFound,

    #[error("question {0} is not part of this session")]
    UnknownQuestion(String),

    #[error("option {option_id} does not belong to question {question_id}")]
    UnknownOption {
        question_id: String,
        option_id: String,
    },

    #[error("session is already completed")]
    AlreadyCompleted,
}

/// The four failure categories a session page distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Fatal for the page; redirect to the session list.
    Load,
    /// Logged only; local state is kept.
    AnswerSubmit,
    /// Blocking; the user stays on the page and may retry.
    Finalize,
    /// Local form input was rejected before any request.
    Validation,
}

/// Where the caller should go after a shell failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirect {
    SessionList(SessionMode),
}

/// Errors surfaced by the session shell.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("failed to load {mode} {session_id}: {source}")]
    Load {
        mode: SessionMode,
        session_id: String,
        redirect: Redirect,
        #[source]
        source: LoadCause,
    },

    #[error("failed to finalize: {0}")]
    Finalize(#[source] GatewayError),

    #[error("operation not allowed while {0}")]
    NotActive(&'static str),

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Why a load failed: the gateway call or the loaded data itself.
#[derive(Debug, Error)]
pub enum LoadCause {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ShellError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ShellError::Load { .. } => FailureKind::Load,
            ShellError::Finalize(_) => FailureKind::Finalize,
            ShellError::NotActive(_) | ShellError::Session(_) => FailureKind::Validation,
        }
    }

    /// The redirect target for fatal failures.
    pub fn redirect(&self) -> Option<Redirect> {
        match self {
            ShellError::Load { redirect, .. } => Some(*redirect),
            _ => None,
        }
    }
}
