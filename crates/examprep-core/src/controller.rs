//! In-memory state of one exam or practice attempt.
//!
//! The controller is synchronous and never talks to the network. The shell
//! calls the gateway and feeds the outcome back through
//! [`SessionController::record_feedback`].

use std::collections::BTreeMap;

use chrono::Utc;

use crate::error::SessionError;
use crate::model::{AnswerOption, Component, PracticeFeedback, Question, Session, SessionMode};

/// The locally submitted answer for one question.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerRecord {
    pub question_id: String,
    pub selected_option_id: String,
    /// Filled from the gateway in practice mode only.
    pub is_correct: Option<bool>,
    pub correct_option_id: Option<String>,
    pub feedback_text: Option<String>,
    revision: u64,
}

impl AnswerRecord {
    /// Whether the gateway's verdict has been applied.
    pub fn is_resolved(&self) -> bool {
        self.is_correct.is_some()
    }
}

/// Identifies the record version a gateway submission was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionTicket {
    pub question_id: String,
    pub option_id: String,
    revision: u64,
}

/// Result of [`SessionController::select_answer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// A new record version was written; submit it to the gateway.
    Recorded(SubmissionTicket),
    /// The same option was already selected. Nothing changed.
    Unchanged,
    /// The question already has resolved feedback (practice mode).
    Locked,
}

/// Result of [`SessionController::record_feedback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackOutcome {
    Applied,
    /// The answer changed after the submission was issued.
    Stale,
    /// Exam sessions never learn correctness before finalizing.
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
    JumpTo(i64),
}

/// Navigator badge for a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionStatus {
    Current,
    Answered,
    Unanswered,
}

/// Correctness marker on an option, shown only when allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reveal {
    /// This is the correct option.
    Correct,
    /// The user picked this option and it is wrong.
    Incorrect,
}

#[derive(Debug, Clone)]
pub struct OptionView<'a> {
    pub option: &'a AnswerOption,
    pub selected: bool,
    pub reveal: Option<Reveal>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackView {
    pub is_correct: bool,
    pub rationale: String,
}

/// Everything needed to render one question.
#[derive(Debug, Clone)]
pub struct QuestionView<'a> {
    pub index: usize,
    pub total: usize,
    pub question: &'a Question,
    pub options: Vec<OptionView<'a>>,
    /// Options can no longer change.
    pub locked: bool,
    pub feedback: Option<FeedbackView>,
    /// Reading-comprehension questions show their passage alongside.
    pub shows_article_panel: bool,
}

/// Single source of truth for where the user is in a session and what they
/// have answered.
#[derive(Debug, Clone)]
pub struct SessionController {
    mode: SessionMode,
    session: Session,
    questions: Vec<Question>,
    answers: BTreeMap<String, AnswerRecord>,
    current: usize,
    next_revision: u64,
}

impl SessionController {
    /// Load a session, replaying any answers the server already has.
    pub fn load(
        mode: SessionMode,
        session: Session,
        questions: Vec<Question>,
    ) -> Result<Self, SessionError> {
        if session.id.is_empty() || questions.is_empty() {
            return Err(SessionError::NotFound);
        }

        let mut controller = Self {
            mode,
            session,
            questions,
            answers: BTreeMap::new(),
            current: 0,
            next_revision: 0,
        };

        let history = controller.session.answers.clone();
        for recorded in history {
            let Some(option_id) = recorded.selected_option_id else {
                continue;
            };
            let Some(question) = controller.question(&recorded.question_id) else {
                tracing::debug!(
                    question_id = %recorded.question_id,
                    "skipping recorded answer for a question outside this session"
                );
                continue;
            };
            if question.option(&option_id).is_none() {
                tracing::debug!(
                    question_id = %recorded.question_id,
                    option_id = %option_id,
                    "skipping recorded answer with an unknown option"
                );
                continue;
            }

            let mut record = AnswerRecord {
                question_id: recorded.question_id.clone(),
                selected_option_id: option_id,
                is_correct: None,
                correct_option_id: None,
                feedback_text: None,
                revision: 0,
            };
            if mode == SessionMode::Practice {
                if let Some(correct) = question.correct_option() {
                    record.is_correct = Some(recorded.is_correct.unwrap_or(false));
                    record.correct_option_id = Some(correct.id.clone());
                    record.feedback_text = Some(question.rationale.clone());
                }
            }
            record.revision = controller.bump_revision();
            controller.answers.insert(recorded.question_id, record);
        }

        Ok(controller)
    }

    fn bump_revision(&mut self) -> u64 {
        self.next_revision += 1;
        self.next_revision
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> &Question {
        &self.questions[self.current]
    }

    pub fn answer(&self, question_id: &str) -> Option<&AnswerRecord> {
        self.answers.get(question_id)
    }

    pub fn answers(&self) -> impl Iterator<Item = &AnswerRecord> {
        self.answers.values()
    }

    pub fn is_completed(&self) -> bool {
        self.session.completed
    }

    /// Write or overwrite the answer for a question.
    pub fn select_answer(
        &mut self,
        question_id: &str,
        option_id: &str,
    ) -> Result<Selection, SessionError> {
        if self.session.completed {
            return Err(SessionError::AlreadyCompleted);
        }
        let question = self
            .question(question_id)
            .ok_or_else(|| SessionError::UnknownQuestion(question_id.to_string()))?;
        if question.option(option_id).is_none() {
            return Err(SessionError::UnknownOption {
                question_id: question_id.to_string(),
                option_id: option_id.to_string(),
            });
        }

        if let Some(existing) = self.answers.get(question_id) {
            if self.mode == SessionMode::Practice && existing.is_resolved() {
                return Ok(Selection::Locked);
            }
            if existing.selected_option_id == option_id {
                return Ok(Selection::Unchanged);
            }
        }

        let revision = self.bump_revision();
        self.answers.insert(
            question_id.to_string(),
            AnswerRecord {
                question_id: question_id.to_string(),
                selected_option_id: option_id.to_string(),
                is_correct: None,
                correct_option_id: None,
                feedback_text: None,
                revision,
            },
        );

        Ok(Selection::Recorded(SubmissionTicket {
            question_id: question_id.to_string(),
            option_id: option_id.to_string(),
            revision,
        }))
    }

    /// Merge gateway feedback into the record the ticket was issued for.
    /// Feedback for a superseded record is discarded.
    pub fn record_feedback(
        &mut self,
        ticket: &SubmissionTicket,
        feedback: &PracticeFeedback,
    ) -> FeedbackOutcome {
        if self.mode == SessionMode::Exam {
            return FeedbackOutcome::Ignored;
        }
        match self.answers.get_mut(&ticket.question_id) {
            Some(record) if record.revision == ticket.revision => {
                record.is_correct = Some(feedback.is_correct);
                record.correct_option_id = Some(feedback.correct_option_id.clone());
                record.feedback_text = Some(feedback.rationale.clone());
                FeedbackOutcome::Applied
            }
            _ => {
                tracing::debug!(
                    question_id = %ticket.question_id,
                    option_id = %ticket.option_id,
                    "discarding stale feedback"
                );
                FeedbackOutcome::Stale
            }
        }
    }

    /// Move the cursor, clamping to the question range.
    pub fn advance(&mut self, direction: Direction) -> usize {
        let last = self.questions.len().saturating_sub(1);
        self.current = match direction {
            Direction::Next => (self.current + 1).min(last),
            Direction::Previous => self.current.saturating_sub(1),
            Direction::JumpTo(index) => index.clamp(0, last as i64) as usize,
        };
        self.current
    }

    /// Mark the session completed. Call only after the gateway finalized it.
    pub fn finalize(&mut self, score: Option<f64>) -> Result<(), SessionError> {
        if self.session.completed {
            return Err(SessionError::AlreadyCompleted);
        }
        self.session.completed = true;
        self.session.finished_at = Some(Utc::now());
        if score.is_some() {
            self.session.score = score;
        }
        Ok(())
    }

    pub fn answered_count(&self) -> usize {
        self.answers
            .values()
            .filter(|r| !r.selected_option_id.is_empty())
            .count()
    }

    pub fn unanswered_count(&self) -> usize {
        self.question_count() - self.answered_count()
    }

    pub fn is_first(&self) -> bool {
        self.current == 0
    }

    pub fn is_last(&self) -> bool {
        self.current + 1 == self.questions.len()
    }

    /// Position-based progress, 0–100.
    pub fn progress_percent(&self) -> f64 {
        (self.current + 1) as f64 / self.questions.len() as f64 * 100.0
    }

    /// One badge per question, in order.
    pub fn navigator(&self) -> Vec<QuestionStatus> {
        self.questions
            .iter()
            .enumerate()
            .map(|(i, q)| {
                if i == self.current {
                    QuestionStatus::Current
                } else if self.answers.contains_key(&q.id) {
                    QuestionStatus::Answered
                } else {
                    QuestionStatus::Unanswered
                }
            })
            .collect()
    }

    pub fn current_view(&self) -> QuestionView<'_> {
        self.view(self.current)
    }

    /// Render data for the question at `index` (clamped).
    pub fn view(&self, index: usize) -> QuestionView<'_> {
        let index = index.min(self.questions.len() - 1);
        let question = &self.questions[index];
        let record = self.answers.get(&question.id);

        let correct_id: Option<&str> = match self.mode {
            SessionMode::Exam if self.session.completed => {
                question.correct_option().map(|o| o.id.as_str())
            }
            SessionMode::Exam => None,
            SessionMode::Practice => record
                .filter(|r| r.is_resolved())
                .and_then(|r| r.correct_option_id.as_deref()),
        };

        let options = question
            .options
            .iter()
            .map(|option| {
                let selected = record.is_some_and(|r| r.selected_option_id == option.id);
                let reveal = correct_id.and_then(|correct| {
                    if option.id == correct {
                        Some(Reveal::Correct)
                    } else if selected {
                        Some(Reveal::Incorrect)
                    } else {
                        None
                    }
                });
                OptionView {
                    option,
                    selected,
                    reveal,
                }
            })
            .collect();

        let feedback = match self.mode {
            SessionMode::Practice => record.and_then(|r| {
                r.is_correct.map(|is_correct| FeedbackView {
                    is_correct,
                    rationale: r.feedback_text.clone().unwrap_or_default(),
                })
            }),
            SessionMode::Exam => None,
        };

        let locked = self.session.completed
            || (self.mode == SessionMode::Practice && record.is_some_and(|r| r.is_resolved()));

        let shows_article_panel = self.session.component_kind()
            == Some(Component::ReadingComprehension)
            && question.article_id.is_some();

        QuestionView {
            index,
            total: self.questions.len(),
            question,
            options,
            locked,
            feedback,
            shows_article_panel,
        }
    }
}
