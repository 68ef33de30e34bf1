//! Row models and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts

pub mod activity;
pub mod calendar_event;
pub mod chat_message;
pub mod drive;
pub mod page;
pub mod page_permission;
