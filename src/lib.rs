//! # libris
//!
//! Client for the mini library catalog service. Authenticates users,
//! persists the session token, and issues catalog requests (list, fetch,
//! issue, return, rate, add, update, delete).
//!
//! The `SessionStore` owns authentication state; catalog calls go straight
//! through the shared `ApiClient` via `services::catalog`.

pub mod config;
pub mod error;
pub mod net;
pub mod services;
pub mod state;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use config::ClientConfig;
pub use error::ApiError;
pub use net::client::ApiClient;
pub use net::types::{AuthPayload, Credentials, ProfileUpdate, Registration, User};
pub use state::{Session, SessionStore};
pub use storage::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
