//! PageSpace workspace event bus.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`WorkspaceEvent`]: the event envelope published after workspace
//!   mutations such as an AI undo.
//! - [`EventLogger`]: background subscriber that writes every event to the
//!   tracing log.

pub mod bus;
pub mod logger;

pub use bus::{event_types, EventBus, WorkspaceEvent};
pub use logger::EventLogger;
