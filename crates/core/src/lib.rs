//! Domain logic for the PageSpace workspace backend.
//!
//! This crate has zero internal dependencies. Persistence is reached only
//! through the collaborator traits in [`ai_undo::store`] and
//! [`ai_undo::restore`], which the `pagespace-db` crate implements.

pub mod activity;
pub mod ai_undo;
pub mod error;
pub mod types;
