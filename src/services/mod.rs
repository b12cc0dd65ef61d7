pub mod attendance_service;
pub mod chat_service;
pub mod export_service;
pub mod quiz_service;
pub mod signaling_service;
pub mod student_service;
pub mod user_service;
pub mod virtual_class_service;
