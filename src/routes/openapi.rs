use axum::Json;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::dto::{
    admin_dto::{CreateUserPayload, CreatedUser, NewStudentProfile, NewTeacherProfile},
    attendance_dto::{AttendanceEntry, AttendanceUpdate, BatchAttendanceResponse, BatchItemResult},
    auth_dto::{LoginPayload, LoginResponse, MeResponse, StudentProfile, TeacherProfile, UserSummary},
    chat_dto::{ChatMessageResponse, PostChatMessagePayload},
    quiz_dto::{
        CreateQuizPayload, QuestionView, QuizQuestionPayload, QuizResponse, SubmissionResult,
        SubmissionView, SubmitQuizPayload,
    },
    student_dto::{
        AddFeedbackPayload, RecordAttendancePayload, RecordPerformancePayload, StudentSummary,
    },
    virtual_class_dto::{
        CreateVirtualClassPayload, JoinResponse, ParticipantView, PersonRef, TeacherSummary,
        VirtualClassResponse,
    },
};
use crate::models::{
    quiz::{GradedAnswer, SubmittedAnswer},
    student::FeedbackEntry,
    user::Role,
    virtual_class::ClassStatus,
};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::health::health,
        crate::routes::auth::login,
        crate::routes::auth::me,
        crate::routes::admin::create_user,
        crate::routes::students::record_attendance,
        crate::routes::students::record_performance,
        crate::routes::students::add_feedback,
        crate::routes::students::summary,
        crate::routes::virtual_class::create_class,
        crate::routes::virtual_class::teacher_classes,
        crate::routes::virtual_class::student_available,
        crate::routes::virtual_class::get_class,
        crate::routes::virtual_class::start_class,
        crate::routes::virtual_class::end_class,
        crate::routes::virtual_class::cancel_class,
        crate::routes::virtual_class::join_class,
        crate::routes::virtual_class::leave_class,
        crate::routes::attendance::get_attendance,
        crate::routes::attendance::mark_attendance,
        crate::routes::attendance::batch_attendance,
        crate::routes::attendance::export_attendance,
        crate::routes::chat::list_messages,
        crate::routes::chat::post_message,
        crate::routes::quiz::create_quiz,
        crate::routes::quiz::teacher_quizzes,
        crate::routes::quiz::student_available,
        crate::routes::quiz::get_quiz,
        crate::routes::quiz::submit_quiz,
        crate::routes::quiz::quiz_submissions,
        crate::routes::quiz::close_quiz,
        crate::routes::signaling::relay_socket,
    ),
    components(schemas(
        Role,
        ClassStatus,
        LoginPayload,
        LoginResponse,
        UserSummary,
        MeResponse,
        TeacherProfile,
        StudentProfile,
        CreateUserPayload,
        NewTeacherProfile,
        NewStudentProfile,
        CreatedUser,
        RecordAttendancePayload,
        RecordPerformancePayload,
        StudentSummary,
        AddFeedbackPayload,
        FeedbackEntry,
        CreateVirtualClassPayload,
        VirtualClassResponse,
        TeacherSummary,
        PersonRef,
        ParticipantView,
        JoinResponse,
        AttendanceUpdate,
        AttendanceEntry,
        BatchItemResult,
        BatchAttendanceResponse,
        PostChatMessagePayload,
        ChatMessageResponse,
        CreateQuizPayload,
        QuizQuestionPayload,
        SubmitQuizPayload,
        SubmittedAnswer,
        GradedAnswer,
        QuestionView,
        QuizResponse,
        SubmissionResult,
        SubmissionView,
    )),
    modifiers(&BearerAuth),
    tags((name = "school-backend", description = "Virtual classes, attendance and signaling"))
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
