//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept `&PgPool` as the first argument.

pub mod activity_repo;
pub mod calendar_event_repo;
pub mod chat_message_repo;
pub mod drive_repo;
pub mod page_permission_repo;
pub mod page_repo;

pub use activity_repo::ActivityRepo;
pub use calendar_event_repo::CalendarEventRepo;
pub use chat_message_repo::ChatMessageRepo;
pub use drive_repo::DriveRepo;
pub use page_permission_repo::PagePermissionRepo;
pub use page_repo::PageRepo;
