pub mod admin;
pub mod attendance;
pub mod auth;
pub mod chat;
pub mod health;
pub mod openapi;
pub mod quiz;
pub mod signaling;
pub mod students;
pub mod virtual_class;
