use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;
use std::collections::HashSet;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::student::round_one_decimal;

pub const MAX_OPTIONS: usize = 4;
pub const DEFAULT_QUESTION_MARKS: i32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Quiz {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub created_by: Uuid,
    pub class_assigned: String,
    pub subject: String,
    pub questions: JsonValue,
    pub total_marks: i32,
    pub duration_minutes: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    pub marks: i32,
}

impl Quiz {
    pub fn questions(&self) -> Result<Vec<QuizQuestion>> {
        serde_json::from_value(self.questions.clone()).map_err(|e| {
            Error::Internal(format!("quiz {} has unreadable questions: {}", self.id, e))
        })
    }

    /// Submissions are accepted between `start_time` and `end_time` while the
    /// quiz is active.
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.start_time <= now && now <= self.end_time
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedAnswer {
    pub question_index: usize,
    pub selected_option: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GradedAnswer {
    pub question_index: usize,
    pub selected_option: usize,
    pub is_correct: bool,
}

#[derive(Debug, Clone, FromRow)]
pub struct QuizSubmission {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub student_id: Uuid,
    pub answers: JsonValue,
    pub score: i32,
    pub percentage: f64,
    pub time_taken_minutes: Option<i32>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuizScore {
    pub answers: Vec<GradedAnswer>,
    pub score: i32,
    pub percentage: f64,
}

pub fn total_marks(questions: &[QuizQuestion]) -> i32 {
    questions.iter().map(|q| q.marks).sum()
}

/// Grades multiple-choice answers by question index. An answer to a
/// question that does not exist, or a second answer to the same question,
/// is kept in the result but earns nothing.
pub fn score_answers(questions: &[QuizQuestion], answers: &[SubmittedAnswer]) -> QuizScore {
    let mut answered = HashSet::new();
    let mut score = 0;
    let mut graded = Vec::with_capacity(answers.len());

    for answer in answers {
        let first = answered.insert(answer.question_index);
        let earned = match questions.get(answer.question_index) {
            Some(q) if first && q.correct_answer == answer.selected_option => Some(q.marks),
            _ => None,
        };
        score += earned.unwrap_or(0);
        graded.push(GradedAnswer {
            question_index: answer.question_index,
            selected_option: answer.selected_option,
            is_correct: earned.is_some(),
        });
    }

    let total = total_marks(questions);
    let percentage = if total > 0 {
        round_one_decimal(score as f64 / total as f64 * 100.0)
    } else {
        0.0
    };

    QuizScore {
        answers: graded,
        score,
        percentage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(correct_answer: usize, marks: i32) -> QuizQuestion {
        QuizQuestion {
            question: "2 + 2 = ?".into(),
            options: vec!["3".into(), "4".into(), "5".into()],
            correct_answer,
            marks,
        }
    }

    fn answer(question_index: usize, selected_option: usize) -> SubmittedAnswer {
        SubmittedAnswer {
            question_index,
            selected_option,
        }
    }

    #[test]
    fn weighted_marks_and_percentage() {
        let questions = vec![question(1, 2), question(0, 1), question(2, 2)];
        let scored = score_answers(&questions, &[answer(0, 1), answer(1, 2), answer(2, 2)]);

        assert_eq!(scored.score, 4);
        assert_eq!(scored.percentage, 80.0);
        let correct: Vec<bool> = scored.answers.iter().map(|a| a.is_correct).collect();
        assert_eq!(correct, vec![true, false, true]);
    }

    #[test]
    fn unanswered_questions_count_against_the_total() {
        let questions = vec![question(1, 1), question(1, 1), question(1, 1)];
        let scored = score_answers(&questions, &[answer(2, 1)]);
        assert_eq!(scored.score, 1);
        assert_eq!(scored.percentage, 33.3);
    }

    #[test]
    fn unknown_and_repeated_answers_earn_nothing() {
        let questions = vec![question(1, 5)];
        let scored = score_answers(&questions, &[answer(0, 1), answer(0, 1), answer(7, 0)]);

        assert_eq!(scored.score, 5);
        assert_eq!(scored.answers.len(), 3);
        assert!(scored.answers[0].is_correct);
        assert!(!scored.answers[1].is_correct);
        assert!(!scored.answers[2].is_correct);
    }

    #[test]
    fn submission_window_needs_an_active_quiz() {
        let start = Utc::now();
        let mut quiz = Quiz {
            id: Uuid::new_v4(),
            title: "Fractions".into(),
            description: None,
            created_by: Uuid::new_v4(),
            class_assigned: "7A".into(),
            subject: "Mathematics".into(),
            questions: serde_json::to_value(vec![question(1, 1)]).unwrap(),
            total_marks: 1,
            duration_minutes: 20,
            start_time: start,
            end_time: start + chrono::Duration::minutes(30),
            is_active: true,
            created_at: start,
            updated_at: start,
        };

        assert!(!quiz.is_open_at(start - chrono::Duration::seconds(1)));
        assert!(quiz.is_open_at(start + chrono::Duration::minutes(10)));
        assert!(!quiz.is_open_at(start + chrono::Duration::minutes(31)));
        assert_eq!(quiz.questions().unwrap(), vec![question(1, 1)]);

        quiz.is_active = false;
        assert!(!quiz.is_open_at(start + chrono::Duration::minutes(10)));
    }
}
