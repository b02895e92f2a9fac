//! Auth service: stateless wrappers for the `/auth` endpoints.
//!
//! These calls neither persist tokens nor touch session state; the session
//! store decides what to do with the results.

use crate::error::ApiError;
use crate::net::client::ApiClient;
use crate::net::types::{AuthPayload, Credentials, ProfileUpdate, Registration, User};

/// `POST /auth/register`.
///
/// # Errors
///
/// Returns the backend rejection (e.g. validation failure) or transport error.
pub async fn register(client: &ApiClient, registration: &Registration) -> Result<AuthPayload, ApiError> {
    client.post(&["auth", "register"], registration).await
}

/// `POST /auth/login`.
///
/// # Errors
///
/// Returns the backend rejection (e.g. invalid credentials) or transport error.
pub async fn login(client: &ApiClient, credentials: &Credentials) -> Result<AuthPayload, ApiError> {
    client.post(&["auth", "login"], credentials).await
}

/// `GET /auth/me`, the identity check. Requires a bearer credential.
///
/// # Errors
///
/// Returns `401`/`403` rejections for missing or invalid credentials.
pub async fn me(client: &ApiClient) -> Result<User, ApiError> {
    client.get(&["auth", "me"]).await
}

/// `PUT /auth/me`. Requires a bearer credential.
///
/// # Errors
///
/// Returns the backend rejection or transport error.
pub async fn update_profile(client: &ApiClient, update: &ProfileUpdate) -> Result<User, ApiError> {
    client.put(&["auth", "me"], update).await
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
