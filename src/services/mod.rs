//! Stateless request wrappers grouped by backend resource.

pub mod auth;
pub mod catalog;
