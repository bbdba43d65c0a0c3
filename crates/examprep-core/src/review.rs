//! Result summary and per-question review for finalized exams.

use crate::model::{FinalizeResult, OptionLabel};

/// How one question ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    Incorrect,
    Unanswered,
}

/// One row of the detailed review.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewItem {
    pub number: usize,
    pub prompt: String,
    pub outcome: Outcome,
    pub selected: Option<OptionLabel>,
    pub correct: Option<OptionLabel>,
    pub rationale: String,
}

impl FinalizeResult {
    pub fn total(&self) -> u32 {
        self.correct_count + self.incorrect_count + self.unanswered_count
    }

    /// Share of correct answers, rounded to a whole percent.
    pub fn percentage(&self) -> u32 {
        let total = self.total();
        if total == 0 {
            return 0;
        }
        (self.correct_count as f64 / total as f64 * 100.0).round() as u32
    }

    /// Per-answer review built from the completed session's history.
    /// Entries without an embedded question are skipped.
    pub fn review(&self) -> Vec<ReviewItem> {
        if !self.session.completed {
            return Vec::new();
        }
        self.session
            .answers
            .iter()
            .filter_map(|answer| answer.question.as_ref().map(|q| (answer, q)))
            .enumerate()
            .map(|(i, (answer, question))| {
                let selected = answer
                    .selected_option_id
                    .as_deref()
                    .and_then(|id| question.option(id))
                    .map(|o| o.label);
                let outcome = match answer.is_correct {
                    Some(true) => Outcome::Correct,
                    Some(false) => Outcome::Incorrect,
                    None => Outcome::Unanswered,
                };
                ReviewItem {
                    number: i + 1,
                    prompt: question.prompt.clone(),
                    outcome,
                    selected,
                    correct: question.correct_option().map(|o| o.label),
                    rationale: question.rationale.clone(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::tests::{question, session};
    use crate::model::RecordedAnswer;

    fn result(correct: u32, incorrect: u32, unanswered: u32) -> FinalizeResult {
        let mut s = session("s1");
        s.completed = true;
        FinalizeResult {
            session: s,
            score: correct as f64 * 10.0,
            correct_count: correct,
            incorrect_count: incorrect,
            unanswered_count: unanswered,
        }
    }

    #[test]
    fn percentage_rounds_and_handles_empty() {
        assert_eq!(result(1, 1, 1).percentage(), 33);
        assert_eq!(result(2, 1, 0).percentage(), 67);
        assert_eq!(result(0, 0, 0).percentage(), 0);
        assert_eq!(result(2, 1, 1).total(), 4);
    }

    #[test]
    fn review_lists_outcomes() {
        let mut r = result(1, 1, 1);
        r.session.answers = vec![
            RecordedAnswer {
                id: "r1".into(),
                question_id: "q1".into(),
                selected_option_id: Some("q1-A".into()),
                is_correct: Some(true),
                question: Some(question("q1", OptionLabel::A)),
            },
            RecordedAnswer {
                id: "r2".into(),
                question_id: "q2".into(),
                selected_option_id: Some("q2-C".into()),
                is_correct: Some(false),
                question: Some(question("q2", OptionLabel::B)),
            },
            RecordedAnswer {
                id: "r3".into(),
                question_id: "q3".into(),
                selected_option_id: None,
                is_correct: None,
                question: Some(question("q3", OptionLabel::C)),
            },
            RecordedAnswer {
                id: "r4".into(),
                question_id: "q4".into(),
                selected_option_id: None,
                is_correct: None,
                question: None,
            },
        ];

        let items = r.review();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].outcome, Outcome::Correct);
        assert_eq!(items[1].selected, Some(OptionLabel::C));
        assert_eq!(items[1].correct, Some(OptionLabel::B));
        assert_eq!(items[2].outcome, Outcome::Unanswered);
        assert_eq!(items[2].number, 3);
    }

    #[test]
    fn review_empty_until_completed() {
        let mut r = result(1, 0, 0);
        r.session.completed = false;
        r.session.answers = vec![RecordedAnswer {
            id: "r1".into(),
            question_id: "q1".into(),
            selected_option_id: Some("q1-A".into()),
            is_correct: Some(true),
            question: Some(question("q1", OptionLabel::A)),
        }];
        assert!(r.review().is_empty());
    }
}
