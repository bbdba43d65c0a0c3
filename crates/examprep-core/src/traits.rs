//! Trait seams between the session shell and its collaborators.
//!
//! The gateway is implemented by `examprep-client`; the notifier and
//! confirmation gate are implemented by whatever front end drives the shell.

use async_trait::async_trait;

use crate::error::GatewayError;
use crate::model::{FinalizeResult, PracticeFeedback, SessionBundle, SessionMode};

// ---------------------------------------------------------------------------
// Remote session gateway
// ---------------------------------------------------------------------------

/// The remote API's session operations.
#[async_trait]
pub trait SessionGateway: Send + Sync {
    /// Fetch a session and its ordered question set.
    ///
    /// Fails with [`GatewayError::NotFound`] when the id is unknown or not
    /// owned by the caller.
    async fn fetch_session(
        &self,
        mode: SessionMode,
        session_id: &str,
    ) -> Result<SessionBundle, GatewayError>;

    /// Submit one answer. Practice sessions answer with feedback; exams
    /// answer with nothing.
    async fn submit_answer(
        &self,
        mode: SessionMode,
        session_id: &str,
        question_id: &str,
        option_id: &str,
    ) -> Result<Option<PracticeFeedback>, GatewayError>;

    /// Finalize a session. Exams return the scored result; practices
    /// return nothing.
    async fn finalize(
        &self,
        mode: SessionMode,
        session_id: &str,
    ) -> Result<Option<FinalizeResult>, GatewayError>;

    /// Fetch the result of an already finalized exam.
    async fn fetch_result(&self, session_id: &str) -> Result<FinalizeResult, GatewayError>;
}

// ---------------------------------------------------------------------------
// Notification surface
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationVariant {
    Default,
    Destructive,
}

/// A toast-style message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub variant: NotificationVariant,
}

impl Notification {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: NotificationVariant::Default,
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: NotificationVariant::Destructive,
        }
    }
}

/// Where user-facing notifications go.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Discards every notification.
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _: Notification) {}
}

// ---------------------------------------------------------------------------
// Destructive-action confirmation
// ---------------------------------------------------------------------------

/// What the user is asked before a session is finalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizePrompt {
    pub mode: SessionMode,
    pub answered: usize,
    pub total: usize,
}

impl FinalizePrompt {
    pub fn unanswered(&self) -> usize {
        self.total.saturating_sub(self.answered)
    }

    pub fn title(&self) -> String {
        match self.mode {
            SessionMode::Exam => "¿Finalizar simulacro?".to_string(),
            SessionMode::Practice => "¿Terminar práctica?".to_string(),
        }
    }

    pub fn description(&self) -> String {
        let mut text = format!(
            "Has respondido {} de {} preguntas.",
            self.answered, self.total
        );
        if self.unanswered() > 0 && self.mode == SessionMode::Exam {
            text.push_str(" Las preguntas sin responder se contarán como incorrectas.");
        }
        text
    }
}

/// Asks the user to confirm an irreversible action.
pub trait ConfirmGate: Send + Sync {
    fn confirm(&self, prompt: &FinalizePrompt) -> bool;
}
