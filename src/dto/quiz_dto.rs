use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::dto::common::not_blank;
use crate::dto::virtual_class_dto::PersonRef;
use crate::models::quiz::{
    GradedAnswer, Quiz, QuizQuestion, SubmittedAnswer, DEFAULT_QUESTION_MARKS, MAX_OPTIONS,
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "answer_among_options"))]
pub struct QuizQuestionPayload {
    #[validate(custom(function = "not_blank"), length(max = 1000))]
    pub question: String,
    #[validate(length(min = 2, max = 4))]
    pub options: Vec<String>,
    pub correct_answer: usize,
    #[validate(range(min = 1, max = 100))]
    pub marks: Option<i32>,
}

fn answer_among_options(payload: &QuizQuestionPayload) -> Result<(), ValidationError> {
    if payload.options.iter().any(|o| o.trim().is_empty()) {
        return Err(ValidationError::new("blank_option"));
    }
    if payload.correct_answer >= payload.options.len().min(MAX_OPTIONS) {
        return Err(ValidationError::new("correct_answer_out_of_range"));
    }
    Ok(())
}

impl QuizQuestionPayload {
    pub fn into_question(self) -> QuizQuestion {
        QuizQuestion {
            question: self.question.trim().to_string(),
            options: self.options.iter().map(|o| o.trim().to_string()).collect(),
            correct_answer: self.correct_answer,
            marks: self.marks.unwrap_or(DEFAULT_QUESTION_MARKS),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "window_is_ordered"))]
pub struct CreateQuizPayload {
    #[validate(custom(function = "not_blank"), length(max = 200))]
    pub title: String,
    pub description: Option<String>,
    #[validate(custom(function = "not_blank"))]
    pub class_assigned: String,
    #[validate(custom(function = "not_blank"))]
    pub subject: String,
    #[validate(length(min = 1, max = 100), nested)]
    pub questions: Vec<QuizQuestionPayload>,
    /// Minutes a student has once they begin.
    #[validate(range(min = 1, max = 300))]
    pub duration: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

fn window_is_ordered(payload: &CreateQuizPayload) -> Result<(), ValidationError> {
    if payload.end_time > payload.start_time {
        Ok(())
    } else {
        Err(ValidationError::new("end_time_before_start_time"))
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitQuizPayload {
    #[validate(length(max = 100))]
    pub answers: Vec<SubmittedAnswer>,
    /// Minutes the student spent, as measured by the client.
    #[validate(range(min = 0))]
    pub time_taken: Option<i32>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuestionView {
    pub question: String,
    pub options: Vec<String>,
    pub marks: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<usize>,
}

/// A quiz as shown to its author (with answers and submission count) or to
/// a student (without answers, with their own submission state).
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuizResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub created_by: Uuid,
    pub class_assigned: String,
    pub subject: String,
    pub questions: Vec<QuestionView>,
    pub total_marks: i32,
    pub duration: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submissions: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted: Option<bool>,
}

impl QuizResponse {
    pub fn new(quiz: Quiz, questions: Vec<QuizQuestion>, show_answers: bool) -> Self {
        let questions = questions
            .into_iter()
            .map(|q| QuestionView {
                question: q.question,
                options: q.options,
                marks: q.marks,
                correct_answer: show_answers.then_some(q.correct_answer),
            })
            .collect();
        Self {
            id: quiz.id,
            title: quiz.title,
            description: quiz.description,
            created_by: quiz.created_by,
            class_assigned: quiz.class_assigned,
            subject: quiz.subject,
            questions,
            total_marks: quiz.total_marks,
            duration: quiz.duration_minutes,
            start_time: quiz.start_time,
            end_time: quiz.end_time,
            is_active: quiz.is_active,
            submissions: None,
            submitted: None,
        }
    }

    pub fn with_submissions(mut self, count: i64) -> Self {
        self.submissions = Some(count);
        self
    }

    pub fn with_submitted(mut self, submitted: bool) -> Self {
        self.submitted = Some(submitted);
        self
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResult {
    pub quiz_id: Uuid,
    pub score: i32,
    pub total_marks: i32,
    pub percentage: f64,
    pub answers: Vec<GradedAnswer>,
    pub time_taken: Option<i32>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionView {
    pub student: PersonRef,
    pub score: i32,
    pub percentage: f64,
    pub time_taken: Option<i32>,
    pub submitted_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(questions: serde_json::Value) -> CreateQuizPayload {
        serde_json::from_value(json!({
            "title": "Fractions check",
            "classAssigned": "7A",
            "subject": "Mathematics",
            "questions": questions,
            "duration": 20,
            "startTime": "2025-03-01T09:00:00Z",
            "endTime": "2025-03-01T10:00:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn well_formed_quiz_passes() {
        let p = payload(json!([
            { "question": "1/2 + 1/4 = ?", "options": ["3/4", "2/6"], "correctAnswer": 0 },
            { "question": "Simplify 2/4", "options": ["1/2", "2/2", "1/4"], "correctAnswer": 0, "marks": 3 }
        ]));
        assert!(p.validate().is_ok());

        let questions: Vec<QuizQuestion> =
            p.questions.into_iter().map(QuizQuestionPayload::into_question).collect();
        assert_eq!(questions[0].marks, DEFAULT_QUESTION_MARKS);
        assert_eq!(questions[1].marks, 3);
    }

    #[test]
    fn correct_answer_must_point_at_an_option() {
        let p = payload(json!([
            { "question": "1/2 + 1/4 = ?", "options": ["3/4", "2/6"], "correctAnswer": 2 }
        ]));
        assert!(p.validate().is_err());
    }

    #[test]
    fn option_count_and_question_list_are_bounded() {
        let too_many = payload(json!([
            { "question": "Pick one", "options": ["a", "b", "c", "d", "e"], "correctAnswer": 0 }
        ]));
        assert!(too_many.validate().is_err());

        let none = payload(json!([]));
        assert!(none.validate().is_err());
    }

    #[test]
    fn window_must_end_after_it_starts() {
        let mut p = payload(json!([
            { "question": "Pick one", "options": ["a", "b"], "correctAnswer": 1 }
        ]));
        p.end_time = p.start_time;
        assert!(p.validate().is_err());
    }

    #[test]
    fn student_view_hides_answers() {
        let p = payload(json!([
            { "question": "Pick one", "options": ["a", "b"], "correctAnswer": 1 }
        ]));
        let questions: Vec<QuizQuestion> =
            p.questions.into_iter().map(QuizQuestionPayload::into_question).collect();
        let quiz = Quiz {
            id: Uuid::new_v4(),
            title: p.title,
            description: None,
            created_by: Uuid::new_v4(),
            class_assigned: p.class_assigned,
            subject: p.subject,
            questions: serde_json::to_value(&questions).unwrap(),
            total_marks: 1,
            duration_minutes: p.duration,
            start_time: p.start_time,
            end_time: p.end_time,
            is_active: true,
            created_at: p.start_time,
            updated_at: p.start_time,
        };

        let student = serde_json::to_value(
            QuizResponse::new(quiz.clone(), questions.clone(), false).with_submitted(false),
        )
        .unwrap();
        assert!(student["questions"][0].get("correctAnswer").is_none());
        assert_eq!(student["submitted"], false);
        assert!(student.get("submissions").is_none());

        let author = serde_json::to_value(
            QuizResponse::new(quiz, questions, true).with_submissions(4),
        )
        .unwrap();
        assert_eq!(author["questions"][0]["correctAnswer"], 1);
        assert_eq!(author["submissions"], 4);
    }
}
