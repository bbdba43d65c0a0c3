//! Session page flow: `Loading → Active → Finalizing → Done`.
//!
//! The shell owns a [`SessionController`] and is the only place gateway calls
//! are made. Answer submissions are dispatched as tokio tasks and their
//! results come back over a channel, so navigation stays responsive while a
//! submission is in flight. At most one submission per question is in
//! flight; a newer answer waits for it and is sent next, so the server sees
//! answers in the order the user gave them.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::controller::{
    Direction, FeedbackOutcome, QuestionView, Selection, SessionController, SubmissionTicket,
};
use crate::error::{GatewayError, LoadCause, Redirect, SessionError, ShellError};
use crate::model::{FinalizeResult, OptionLabel, PracticeFeedback, SessionMode};
use crate::traits::{ConfirmGate, FinalizePrompt, Notification, Notifier, SessionGateway};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellState {
    Loading,
    Active,
    Finalizing,
    Done,
}

impl ShellState {
    pub fn name(self) -> &'static str {
        match self {
            ShellState::Loading => "loading",
            ShellState::Active => "active",
            ShellState::Finalizing => "finalizing",
            ShellState::Done => "done",
        }
    }
}

impl fmt::Display for ShellState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where to go once a session is finished.
#[derive(Debug, Clone)]
pub enum Navigation {
    /// Show the exam result that finalize returned.
    Result(Box<FinalizeResult>),
    /// Show the result page, which fetches the result itself.
    ResultPage { session_id: String },
    /// Back to the list of sessions.
    SessionList(SessionMode),
}

#[derive(Debug, Clone)]
pub enum FinishOutcome {
    /// The user declined the confirmation.
    Cancelled,
    Finished(Navigation),
}

struct SubmissionOutcome {
    ticket: SubmissionTicket,
    result: Result<Option<PracticeFeedback>, GatewayError>,
}

/// Sends the outcome when dropped, so a task that unwinds still reports.
struct OutcomeReply {
    tx: mpsc::UnboundedSender<SubmissionOutcome>,
    ticket: SubmissionTicket,
    result: Option<Result<Option<PracticeFeedback>, GatewayError>>,
}

impl Drop for OutcomeReply {
    fn drop(&mut self) {
        let result = self.result.take().unwrap_or_else(|| {
            Err(GatewayError::Network(
                "submission ended without a response".into(),
            ))
        });
        // The receiver is gone only if the page was torn down.
        let _ = self.tx.send(SubmissionOutcome {
            ticket: self.ticket.clone(),
            result,
        });
    }
}

/// Drives one session page.
pub struct SessionShell {
    gateway: Arc<dyn SessionGateway>,
    notifier: Arc<dyn Notifier>,
    controller: SessionController,
    state: ShellState,
    outcomes_tx: mpsc::UnboundedSender<SubmissionOutcome>,
    outcomes_rx: mpsc::UnboundedReceiver<SubmissionOutcome>,
    in_flight: usize,
    /// Questions with a submission in flight, and the answer queued behind it.
    queued: HashMap<String, Option<SubmissionTicket>>,
    submit_failures: usize,
}

impl SessionShell {
    /// Load a session. Any failure notifies the user and yields a
    /// [`ShellError::Load`] carrying the redirect to the session list.
    pub async fn open(
        gateway: Arc<dyn SessionGateway>,
        notifier: Arc<dyn Notifier>,
        mode: SessionMode,
        session_id: &str,
    ) -> Result<Self, ShellError> {
        tracing::info!(%mode, session_id, "loading session");

        let loaded = match gateway.fetch_session(mode, session_id).await {
            Ok(bundle) => SessionController::load(mode, bundle.session, bundle.questions)
                .map_err(LoadCause::from),
            Err(e) => Err(LoadCause::from(e)),
        };

        let controller = match loaded {
            Ok(controller) => controller,
            Err(cause) => {
                let description = match &cause {
                    LoadCause::Gateway(e) => e.user_message(),
                    LoadCause::Session(_) => {
                        format!("No se encontraron preguntas para este {}", mode.label())
                    }
                };
                notifier.notify(Notification::error(
                    format!("Error al cargar {}", mode.label()),
                    description,
                ));
                return Err(ShellError::Load {
                    mode,
                    session_id: session_id.to_string(),
                    redirect: Redirect::SessionList(mode),
                    source: cause,
                });
            }
        };

        let state = if controller.is_completed() {
            ShellState::Done
        } else {
            ShellState::Active
        };
        tracing::debug!(
            questions = controller.question_count(),
            answered = controller.answered_count(),
            %state,
            "session loaded"
        );

        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();
        Ok(Self {
            gateway,
            notifier,
            controller,
            state,
            outcomes_tx,
            outcomes_rx,
            in_flight: 0,
            queued: HashMap::new(),
            submit_failures: 0,
        })
    }

    pub fn state(&self) -> ShellState {
        self.state
    }

    pub fn mode(&self) -> SessionMode {
        self.controller.mode()
    }

    pub fn session_id(&self) -> &str {
        &self.controller.session().id
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    pub fn view(&self) -> QuestionView<'_> {
        self.controller.current_view()
    }

    /// Submissions dispatched but not yet applied.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Answers waiting for an earlier submission of the same question.
    pub fn queued(&self) -> usize {
        self.queued.values().filter(|t| t.is_some()).count()
    }

    /// Submissions the gateway rejected. These are never retried.
    pub fn submit_failures(&self) -> usize {
        self.submit_failures
    }

    fn ensure_active(&self) -> Result<(), ShellError> {
        if self.state == ShellState::Active {
            Ok(())
        } else {
            Err(ShellError::NotActive(self.state.name()))
        }
    }

    /// Answer the current question with `option_id`.
    pub fn select(&mut self, option_id: &str) -> Result<Selection, ShellError> {
        self.ensure_active()?;
        self.drain_feedback();

        let question_id = self.controller.current_question().id.clone();
        let selection = self.controller.select_answer(&question_id, option_id)?;
        if let Selection::Recorded(ticket) = &selection {
            self.dispatch(ticket.clone());
        }
        Ok(selection)
    }

    /// Answer the current question by its option letter.
    pub fn select_label(&mut self, label: OptionLabel) -> Result<Selection, ShellError> {
        let question = self.controller.current_question();
        let option_id = question
            .option_by_label(label)
            .map(|o| o.id.clone())
            .ok_or_else(|| SessionError::UnknownOption {
                question_id: question.id.clone(),
                option_id: label.to_string(),
            })?;
        self.select(&option_id)
    }

    fn dispatch(&mut self, ticket: SubmissionTicket) {
        if let Some(waiting) = self.queued.get_mut(&ticket.question_id) {
            tracing::debug!(question_id = %ticket.question_id, "answer queued");
            *waiting = Some(ticket);
            return;
        }
        self.queued.insert(ticket.question_id.clone(), None);

        let gateway = Arc::clone(&self.gateway);
        let tx = self.outcomes_tx.clone();
        let mode = self.controller.mode();
        let session_id = self.controller.session().id.clone();

        self.in_flight += 1;
        tokio::spawn(async move {
            let mut reply = OutcomeReply {
                tx,
                ticket,
                result: None,
            };
            let ticket = &reply.ticket;
            let result = gateway
                .submit_answer(mode, &session_id, &ticket.question_id, &ticket.option_id)
                .await;
            reply.result = Some(result);
        });
    }

    fn apply(&mut self, outcome: SubmissionOutcome) {
        self.in_flight = self.in_flight.saturating_sub(1);
        let next = self.queued.remove(&outcome.ticket.question_id).flatten();
        match outcome.result {
            Ok(Some(feedback)) => {
                if self.controller.record_feedback(&outcome.ticket, &feedback)
                    == FeedbackOutcome::Applied
                {
                    tracing::debug!(question_id = %outcome.ticket.question_id, "feedback applied");
                }
            }
            Ok(None) => {}
            Err(e) => {
                self.submit_failures += 1;
                tracing::warn!(
                    question_id = %outcome.ticket.question_id,
                    error = %e,
                    "failed to save answer"
                );
            }
        }
        if let Some(ticket) = next {
            self.dispatch(ticket);
        }
    }

    /// Apply every submission result that has already arrived.
    pub fn drain_feedback(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(outcome) = self.outcomes_rx.try_recv() {
            self.apply(outcome);
            applied += 1;
        }
        applied
    }

    /// Wait for every in-flight and queued submission to resolve and apply it.
    pub async fn settle(&mut self) {
        while self.in_flight > 0 {
            match self.outcomes_rx.recv().await {
                Some(outcome) => self.apply(outcome),
                None => break,
            }
        }
    }

    pub fn next(&mut self) -> usize {
        self.navigate(Direction::Next)
    }

    pub fn previous(&mut self) -> usize {
        self.navigate(Direction::Previous)
    }

    /// Jump to a zero-based question index. Out-of-range input clamps.
    pub fn jump_to(&mut self, index: i64) -> usize {
        self.navigate(Direction::JumpTo(index))
    }

    fn navigate(&mut self, direction: Direction) -> usize {
        self.drain_feedback();
        self.controller.advance(direction)
    }

    /// Ask for confirmation, then finalize the session with the gateway.
    ///
    /// A gateway failure notifies the user and returns the shell to
    /// `Active` so finishing can be retried.
    pub async fn finish(&mut self, gate: &dyn ConfirmGate) -> Result<FinishOutcome, ShellError> {
        self.ensure_active()?;
        self.drain_feedback();

        let mode = self.controller.mode();
        let prompt = FinalizePrompt {
            mode,
            answered: self.controller.answered_count(),
            total: self.controller.question_count(),
        };
        if !gate.confirm(&prompt) {
            return Ok(FinishOutcome::Cancelled);
        }

        self.state = ShellState::Finalizing;
        self.settle().await;

        let session_id = self.controller.session().id.clone();
        let result = match self.gateway.finalize(mode, &session_id).await {
            Ok(result) => result,
            Err(e) => {
                self.state = ShellState::Active;
                self.notifier
                    .notify(Notification::error("Error al finalizar", e.user_message()));
                return Err(ShellError::Finalize(e));
            }
        };

        self.controller.finalize(result.as_ref().map(|r| r.score))?;
        self.state = ShellState::Done;
        tracing::info!(%mode, session_id = %session_id, "session finalized");

        let navigation = match (mode, result) {
            (SessionMode::Exam, Some(result)) => Navigation::Result(Box::new(result)),
            (SessionMode::Exam, None) => Navigation::ResultPage { session_id },
            (SessionMode::Practice, _) => {
                self.notifier.notify(Notification::info(
                    "¡Práctica completada!",
                    "Has terminado tu sesión de práctica.",
                ));
                Navigation::SessionList(SessionMode::Practice)
            }
        };
        Ok(FinishOutcome::Finished(navigation))
    }
}

/// Load an exam result for the result page, e.g. after a reload.
pub async fn load_result(
    gateway: &dyn SessionGateway,
    notifier: &dyn Notifier,
    session_id: &str,
) -> Result<FinalizeResult, ShellError> {
    gateway.fetch_result(session_id).await.map_err(|e| {
        notifier.notify(Notification::error(
            "Error al cargar resultados",
            e.user_message(),
        ));
        ShellError::Load {
            mode: SessionMode::Exam,
            session_id: session_id.to_string(),
            redirect: Redirect::SessionList(SessionMode::Exam),
            source: e.into(),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::controller::tests::{question, session};
    use crate::error::FailureKind;
    use crate::model::SessionBundle;

    #[derive(Default)]
    struct FakeGateway {
        bundle: Option<SessionBundle>,
        submit_error: bool,
        submit_panics: bool,
        finalize_results: Mutex<VecDeque<Result<Option<FinalizeResult>, GatewayError>>>,
        finalize_calls: Mutex<u32>,
    }

    #[async_trait]
    impl SessionGateway for FakeGateway {
        async fn fetch_session(
            &self,
            _: SessionMode,
            session_id: &str,
        ) -> Result<SessionBundle, GatewayError> {
            self.bundle
                .clone()
                .ok_or_else(|| GatewayError::NotFound(format!("Simulacro {session_id} no encontrado")))
        }

        async fn submit_answer(
            &self,
            _: SessionMode,
            _: &str,
            _: &str,
            _: &str,
        ) -> Result<Option<PracticeFeedback>, GatewayError> {
            if self.submit_panics {
                panic!("gateway bug");
            }
            if self.submit_error {
                Err(GatewayError::Network("connection reset".into()))
            } else {
                Ok(None)
            }
        }

        async fn finalize(
            &self,
            _: SessionMode,
            _: &str,
        ) -> Result<Option<FinalizeResult>, GatewayError> {
            *self.finalize_calls.lock().unwrap() += 1;
            self.finalize_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(None))
        }

        async fn fetch_result(&self, session_id: &str) -> Result<FinalizeResult, GatewayError> {
            Err(GatewayError::NotFound(session_id.to_string()))
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Notification>>);

    impl Notifier for Recorder {
        fn notify(&self, notification: Notification) {
            self.0.lock().unwrap().push(notification);
        }
    }

    impl Recorder {
        fn titles(&self) -> Vec<String> {
            self.0.lock().unwrap().iter().map(|n| n.title.clone()).collect()
        }
    }

    struct Always(bool);

    impl ConfirmGate for Always {
        fn confirm(&self, _: &FinalizePrompt) -> bool {
            self.0
        }
    }

    fn bundle() -> SessionBundle {
        SessionBundle {
            session: session("s1"),
            questions: vec![
                question("q1", OptionLabel::A),
                question("q2", OptionLabel::B),
            ],
        }
    }

    async fn open_with(gateway: FakeGateway) -> (SessionShell, Arc<FakeGateway>, Arc<Recorder>) {
        let gateway = Arc::new(gateway);
        let notifier = Arc::new(Recorder::default());
        let shell = SessionShell::open(gateway.clone(), notifier.clone(), SessionMode::Exam, "s1")
            .await
            .unwrap();
        (shell, gateway, notifier)
    }

    #[tokio::test]
    async fn load_failure_notifies_and_redirects() {
        let notifier = Arc::new(Recorder::default());
        let err = SessionShell::open(
            Arc::new(FakeGateway::default()),
            notifier.clone(),
            SessionMode::Exam,
            "missing",
        )
        .await
        .err()
        .unwrap();
        assert_eq!(err.kind(), FailureKind::Load);
        assert_eq!(
            err.redirect(),
            Some(Redirect::SessionList(SessionMode::Exam))
        );
        assert_eq!(notifier.titles(), vec!["Error al cargar simulacro"]);
    }

    #[tokio::test]
    async fn empty_question_list_fails_closed() {
        let mut b = bundle();
        b.questions.clear();
        let notifier = Arc::new(Recorder::default());
        let result = SessionShell::open(
            Arc::new(FakeGateway {
                bundle: Some(b),
                ..Default::default()
            }),
            notifier.clone(),
            SessionMode::Exam,
            "s1",
        )
        .await;
        assert!(matches!(result, Err(ShellError::Load { .. })));
        assert_eq!(notifier.0.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn submit_failure_keeps_local_answer() {
        let (mut shell, _, notifier) = open_with(FakeGateway {
            bundle: Some(bundle()),
            submit_error: true,
            ..Default::default()
        })
        .await;

        shell.select("q1-B").unwrap();
        shell.settle().await;

        assert_eq!(shell.submit_failures(), 1);
        assert_eq!(shell.controller().answered_count(), 1);
        assert_eq!(shell.state(), ShellState::Active);
        assert!(notifier.titles().is_empty());
    }

    #[tokio::test]
    async fn panicking_submission_does_not_hang_finish() {
        let (mut shell, gateway, _) = open_with(FakeGateway {
            bundle: Some(bundle()),
            submit_panics: true,
            ..Default::default()
        })
        .await;

        shell.select("q1-A").unwrap();
        let outcome = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            shell.finish(&Always(true)),
        )
        .await
        .expect("finish should not wait on a dead submission")
        .unwrap();

        assert!(matches!(outcome, FinishOutcome::Finished(_)));
        assert_eq!(shell.in_flight(), 0);
        assert_eq!(shell.submit_failures(), 1);
        assert_eq!(*gateway.finalize_calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn cancelled_confirmation_stays_active() {
        let (mut shell, gateway, _) = open_with(FakeGateway {
            bundle: Some(bundle()),
            ..Default::default()
        })
        .await;

        let outcome = shell.finish(&Always(false)).await.unwrap();
        assert!(matches!(outcome, FinishOutcome::Cancelled));
        assert_eq!(shell.state(), ShellState::Active);
        assert_eq!(*gateway.finalize_calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn finalize_failure_can_be_retried() {
        let gateway = FakeGateway {
            bundle: Some(bundle()),
            ..Default::default()
        };
        gateway.finalize_results.lock().unwrap().extend([
            Err(GatewayError::Api {
                status: 500,
                message: "Servidor no disponible".into(),
            }),
            Ok(None),
        ]);
        let (mut shell, gateway, notifier) = open_with(gateway).await;

        let err = shell.finish(&Always(true)).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Finalize);
        assert_eq!(shell.state(), ShellState::Active);
        assert!(!shell.controller().is_completed());
        assert_eq!(notifier.titles(), vec!["Error al finalizar"]);

        let outcome = shell.finish(&Always(true)).await.unwrap();
        assert!(matches!(
            outcome,
            FinishOutcome::Finished(Navigation::ResultPage { .. })
        ));
        assert_eq!(shell.state(), ShellState::Done);
        assert_eq!(*gateway.finalize_calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn finish_twice_is_rejected_without_second_call() {
        let (mut shell, gateway, _) = open_with(FakeGateway {
            bundle: Some(bundle()),
            ..Default::default()
        })
        .await;

        shell.finish(&Always(true)).await.unwrap();
        let err = shell.finish(&Always(true)).await.unwrap_err();
        assert!(matches!(err, ShellError::NotActive("done")));
        assert_eq!(*gateway.finalize_calls.lock().unwrap(), 1);
        assert!(matches!(
            shell.select("q1-A"),
            Err(ShellError::NotActive(_))
        ));
    }

    #[tokio::test]
    async fn completed_session_opens_done() {
        let mut b = bundle();
        b.session.completed = true;
        let (shell, _, _) = open_with(FakeGateway {
            bundle: Some(b),
            ..Default::default()
        })
        .await;
        assert_eq!(shell.state(), ShellState::Done);
    }

    #[tokio::test]
    async fn load_result_failure_redirects() {
        let notifier = Recorder::default();
        let err = load_result(&FakeGateway::default(), &notifier, "s9")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::Load);
        assert_eq!(notifier.titles(), vec!["Error al cargar resultados"]);
    }
}
