//! In-memory gateway for tests and offline runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use examprep_core::error::GatewayError;
use examprep_core::model::{
    AnswerOption, FinalizeResult, OptionLabel, PracticeFeedback, Question, RecordedAnswer,
    Session, SessionBundle, SessionMode,
};
use examprep_core::traits::SessionGateway;

struct StoredSession {
    mode: SessionMode,
    bundle: SessionBundle,
}

/// A session gateway backed by a map, with scriptable failures and latency.
///
/// Scores the way the server does: unanswered questions count against the
/// exam and the score is the correct share of all questions.
#[derive(Default)]
pub struct MockGateway {
    sessions: Mutex<HashMap<String, StoredSession>>,
    submit_failures: Mutex<HashMap<String, GatewayError>>,
    finalize_failures: Mutex<Vec<GatewayError>>,
    delays: Mutex<HashMap<String, Duration>>,
    fetch_count: AtomicU32,
    submit_count: AtomicU32,
    finalize_count: AtomicU32,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fresh session over `questions` and return its id.
    pub fn seed(&self, mode: SessionMode, questions: Vec<Question>) -> String {
        let id = Uuid::new_v4().to_string();
        let component_id = questions
            .first()
            .map(|q| q.component_id.clone())
            .unwrap_or_default();
        let session = Session {
            id: id.clone(),
            user_id: "mock-user".into(),
            component_id,
            component: None,
            started_at: Utc::now(),
            finished_at: None,
            score: None,
            total_time: None,
            completed: false,
            answers: Vec::new(),
            article_id: None,
            subtopic_id: None,
            general_topic_id: None,
            socio_emotional_topic_id: None,
        };
        self.insert(mode, SessionBundle { session, questions });
        id
    }

    /// Store a prepared session, replacing any with the same id.
    pub fn insert(&self, mode: SessionMode, bundle: SessionBundle) {
        lock(&self.sessions).insert(bundle.session.id.clone(), StoredSession { mode, bundle });
    }

    /// Pre-record an answer, as if submitted in an earlier visit.
    pub fn preanswer(&self, session_id: &str, question_id: &str, option_id: &str) {
        let mut sessions = lock(&self.sessions);
        if let Some(stored) = sessions.get_mut(session_id) {
            let _ = record(&mut stored.bundle, question_id, option_id);
        }
    }

    /// Fail every submission for `question_id` with `error`.
    pub fn fail_submit(&self, question_id: &str, error: GatewayError) {
        lock(&self.submit_failures).insert(question_id.to_string(), error);
    }

    /// Fail the next finalize call with `error`. Queued failures are used in order.
    pub fn fail_next_finalize(&self, error: GatewayError) {
        lock(&self.finalize_failures).push(error);
    }

    /// Delay every submission of `option_id` by `delay`.
    pub fn delay_option(&self, option_id: &str, delay: Duration) {
        lock(&self.delays).insert(option_id.to_string(), delay);
    }

    pub fn fetch_count(&self) -> u32 {
        self.fetch_count.load(Ordering::Relaxed)
    }

    pub fn submit_count(&self) -> u32 {
        self.submit_count.load(Ordering::Relaxed)
    }

    pub fn finalize_count(&self) -> u32 {
        self.finalize_count.load(Ordering::Relaxed)
    }

    /// Answers the server currently holds for a session.
    pub fn recorded_answers(&self, session_id: &str) -> Vec<RecordedAnswer> {
        lock(&self.sessions)
            .get(session_id)
            .map(|s| s.bundle.session.answers.clone())
            .unwrap_or_default()
    }

    pub fn is_completed(&self, session_id: &str) -> bool {
        lock(&self.sessions)
            .get(session_id)
            .is_some_and(|s| s.bundle.session.completed)
    }
}

/// Sample questions `q1..=qN`, each with options A-D and `correct` right.
pub fn sample_questions(count: usize, correct: OptionLabel) -> Vec<Question> {
    (1..=count)
        .map(|n| {
            let id = format!("q{n}");
            let options = [OptionLabel::A, OptionLabel::B, OptionLabel::C, OptionLabel::D]
                .into_iter()
                .map(|label| AnswerOption {
                    id: format!("{id}-{label}"),
                    label,
                    text: format!("Opción {label} de la pregunta {n}"),
                    is_correct: label == correct,
                })
                .collect();
            Question {
                id: id.clone(),
                prompt: format!("Pregunta {n}"),
                rationale: format!("La respuesta correcta es {correct}."),
                component_id: "mock-component".into(),
                article_id: None,
                options,
            }
        })
        .collect()
}

fn record(
    bundle: &mut SessionBundle,
    question_id: &str,
    option_id: &str,
) -> Result<PracticeFeedback, GatewayError> {
    let question = bundle
        .questions
        .iter()
        .find(|q| q.id == question_id)
        .ok_or_else(|| GatewayError::NotFound("Pregunta no encontrada".into()))?;
    let option = question.option(option_id).ok_or_else(|| GatewayError::Api {
        status: 400,
        message: "La opción no pertenece a la pregunta".into(),
    })?;
    let feedback = PracticeFeedback {
        is_correct: option.is_correct,
        correct_option_id: question
            .correct_option()
            .map(|o| o.id.clone())
            .unwrap_or_default(),
        rationale: question.rationale.clone(),
    };

    let answers = &mut bundle.session.answers;
    match answers.iter_mut().find(|a| a.question_id == question_id) {
        Some(existing) => {
            existing.selected_option_id = Some(option_id.to_string());
            existing.is_correct = Some(feedback.is_correct);
        }
        None => answers.push(RecordedAnswer {
            id: Uuid::new_v4().to_string(),
            question_id: question_id.to_string(),
            selected_option_id: Some(option_id.to_string()),
            is_correct: Some(feedback.is_correct),
            question: None,
        }),
    }
    Ok(feedback)
}

fn score(bundle: &SessionBundle) -> FinalizeResult {
    let total = bundle.questions.len() as u32;
    let correct = bundle
        .session
        .answers
        .iter()
        .filter(|a| a.is_correct == Some(true))
        .count() as u32;
    let answered = bundle
        .session
        .answers
        .iter()
        .filter(|a| a.selected_option_id.is_some())
        .count() as u32;
    let score = if total == 0 {
        0.0
    } else {
        (f64::from(correct) / f64::from(total) * 10_000.0).round() / 100.0
    };
    let mut session = bundle.session.clone();
    for answer in &mut session.answers {
        answer.question = bundle
            .questions
            .iter()
            .find(|q| q.id == answer.question_id)
            .cloned();
    }
    FinalizeResult {
        session,
        score,
        correct_count: correct,
        incorrect_count: answered - correct,
        unanswered_count: total - answered,
    }
}

fn not_found(mode: SessionMode) -> GatewayError {
    match mode {
        SessionMode::Exam => GatewayError::NotFound("Simulacro no encontrado".into()),
        SessionMode::Practice => GatewayError::NotFound("Práctica no encontrada".into()),
    }
}

#[async_trait]
impl SessionGateway for MockGateway {
    async fn fetch_session(
        &self,
        mode: SessionMode,
        session_id: &str,
    ) -> Result<SessionBundle, GatewayError> {
        self.fetch_count.fetch_add(1, Ordering::Relaxed);
        lock(&self.sessions)
            .get(session_id)
            .filter(|s| s.mode == mode)
            .map(|s| s.bundle.clone())
            .ok_or_else(|| not_found(mode))
    }

    async fn submit_answer(
        &self,
        mode: SessionMode,
        session_id: &str,
        question_id: &str,
        option_id: &str,
    ) -> Result<Option<PracticeFeedback>, GatewayError> {
        self.submit_count.fetch_add(1, Ordering::Relaxed);

        let delay = lock(&self.delays).get(option_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = lock(&self.submit_failures).get(question_id).cloned() {
            return Err(error);
        }

        let mut sessions = lock(&self.sessions);
        let stored = sessions
            .get_mut(session_id)
            .filter(|s| s.mode == mode)
            .ok_or_else(|| not_found(mode))?;
        if stored.bundle.session.completed {
            return Err(GatewayError::Api {
                status: 400,
                message: format!("El {} ya fue finalizado", mode.label()),
            });
        }
        let feedback = record(&mut stored.bundle, question_id, option_id)?;
        Ok(match mode {
            SessionMode::Exam => None,
            SessionMode::Practice => Some(feedback),
        })
    }

    async fn finalize(
        &self,
        mode: SessionMode,
        session_id: &str,
    ) -> Result<Option<FinalizeResult>, GatewayError> {
        self.finalize_count.fetch_add(1, Ordering::Relaxed);
        {
            let mut failures = lock(&self.finalize_failures);
            if !failures.is_empty() {
                return Err(failures.remove(0));
            }
        }

        let mut sessions = lock(&self.sessions);
        let stored = sessions
            .get_mut(session_id)
            .filter(|s| s.mode == mode)
            .ok_or_else(|| not_found(mode))?;
        let session = &mut stored.bundle.session;
        if session.completed {
            return Err(GatewayError::Api {
                status: 400,
                message: format!("El {} ya fue finalizado", mode.label()),
            });
        }
        let now = Utc::now();
        session.completed = true;
        session.finished_at = Some(now);
        session.total_time = u64::try_from((now - session.started_at).num_seconds()).ok();

        match mode {
            SessionMode::Exam => {
                let points = score(&stored.bundle).score;
                stored.bundle.session.score = Some(points);
                Ok(Some(score(&stored.bundle)))
            }
            SessionMode::Practice => Ok(None),
        }
    }

    async fn fetch_result(&self, session_id: &str) -> Result<FinalizeResult, GatewayError> {
        let sessions = lock(&self.sessions);
        let stored = sessions
            .get(session_id)
            .filter(|s| s.mode == SessionMode::Exam)
            .ok_or_else(|| not_found(SessionMode::Exam))?;
        if !stored.bundle.session.completed {
            return Err(GatewayError::Api {
                status: 400,
                message: "El simulacro aún no fue finalizado".into(),
            });
        }
        Ok(score(&stored.bundle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn exam_scores_unanswered_as_missing() {
        let gateway = MockGateway::new();
        let id = gateway.seed(SessionMode::Exam, sample_questions(3, OptionLabel::B));

        gateway
            .submit_answer(SessionMode::Exam, &id, "q1", "q1-B")
            .await
            .unwrap();
        gateway
            .submit_answer(SessionMode::Exam, &id, "q3", "q3-A")
            .await
            .unwrap();

        let result = gateway
            .finalize(SessionMode::Exam, &id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.correct_count, 1);
        assert_eq!(result.incorrect_count, 1);
        assert_eq!(result.unanswered_count, 1);
        assert!((result.score - 33.33).abs() < 1e-9);
        assert!(result.session.completed);
        assert_eq!(result.review().len(), 2);

        let fetched = gateway.fetch_result(&id).await.unwrap();
        assert_eq!(fetched.unanswered_count, 1);
    }

    #[tokio::test]
    async fn practice_returns_feedback() {
        let gateway = MockGateway::new();
        let id = gateway.seed(SessionMode::Practice, sample_questions(2, OptionLabel::C));

        let feedback = gateway
            .submit_answer(SessionMode::Practice, &id, "q1", "q1-A")
            .await
            .unwrap()
            .unwrap();
        assert!(!feedback.is_correct);
        assert_eq!(feedback.correct_option_id, "q1-C");
        assert!(gateway
            .finalize(SessionMode::Practice, &id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn resubmission_replaces_answer() {
        let gateway = MockGateway::new();
        let id = gateway.seed(SessionMode::Exam, sample_questions(1, OptionLabel::A));
        gateway
            .submit_answer(SessionMode::Exam, &id, "q1", "q1-B")
            .await
            .unwrap();
        gateway
            .submit_answer(SessionMode::Exam, &id, "q1", "q1-A")
            .await
            .unwrap();

        let answers = gateway.recorded_answers(&id);
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].selected_option_id.as_deref(), Some("q1-A"));
        assert_eq!(gateway.submit_count(), 2);
    }

    #[tokio::test]
    async fn wrong_mode_or_id_is_not_found() {
        let gateway = MockGateway::new();
        let id = gateway.seed(SessionMode::Exam, sample_questions(1, OptionLabel::A));
        assert!(gateway
            .fetch_session(SessionMode::Practice, &id)
            .await
            .unwrap_err()
            .is_not_found());
        assert!(gateway
            .fetch_session(SessionMode::Exam, "missing")
            .await
            .unwrap_err()
            .is_not_found());
        assert_eq!(gateway.fetch_count(), 2);
    }

    #[tokio::test]
    async fn scripted_finalize_failure_is_used_once() {
        let gateway = MockGateway::new();
        let id = gateway.seed(SessionMode::Exam, sample_questions(1, OptionLabel::A));
        gateway.fail_next_finalize(GatewayError::Network("connection reset".into()));

        assert!(gateway.finalize(SessionMode::Exam, &id).await.is_err());
        assert!(!gateway.is_completed(&id));
        assert!(gateway.finalize(SessionMode::Exam, &id).await.is_ok());
        assert!(gateway.is_completed(&id));
        assert!(gateway.finalize(SessionMode::Exam, &id).await.is_err());
        assert_eq!(gateway.finalize_count(), 3);
    }

    #[tokio::test]
    async fn answers_after_completion_are_rejected() {
        let gateway = MockGateway::new();
        let id = gateway.seed(SessionMode::Practice, sample_questions(1, OptionLabel::A));
        gateway.finalize(SessionMode::Practice, &id).await.unwrap();
        let err = gateway
            .submit_answer(SessionMode::Practice, &id, "q1", "q1-A")
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Api { status: 400, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_option_waits() {
        let gateway = MockGateway::new();
        let id = gateway.seed(SessionMode::Exam, sample_questions(1, OptionLabel::A));
        gateway.delay_option("q1-A", Duration::from_secs(5));

        let start = tokio::time::Instant::now();
        gateway
            .submit_answer(SessionMode::Exam, &id, "q1", "q1-A")
            .await
            .unwrap();
        assert!(start.elapsed() >= Duration::from_secs(5));
    }
}
