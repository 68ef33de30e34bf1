//! Request extractors.
//!
//! - [`auth::AuthUser`] resolves the caller from a bearer access token.

pub mod auth;
