pub mod admin_dto;
pub mod attendance_dto;
pub mod auth_dto;
pub mod chat_dto;
pub mod common;
pub mod quiz_dto;
pub mod student_dto;
pub mod virtual_class_dto;
