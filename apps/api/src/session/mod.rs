//! Recruiter sessions: state, registry, HTTP handlers and view models.

pub mod handlers;
pub mod registry;
pub mod store;
pub mod view;
