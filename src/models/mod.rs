pub mod chat_message;
pub mod participant;
pub mod quiz;
pub mod student;
pub mod teacher;
pub mod user;
pub mod virtual_class;
