#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use crate::net::types::{AuthPayload, User};

/// Authentication state observed by consumers.
///
/// Transitions are pure: each returns the next `Session` and leaves storage
/// and transport side effects to the store.
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    pub token: Option<String>,
    /// `None` while the first identity check is pending.
    pub is_authenticated: Option<bool>,
    pub user: Option<User>,
    pub loading: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::pending(None)
    }
}

impl Session {
    /// State before `initialize` has resolved.
    #[must_use]
    pub fn pending(token: Option<String>) -> Self {
        Self { token, is_authenticated: None, user: None, loading: true }
    }

    /// Logged out, nothing in flight.
    #[must_use]
    pub fn signed_out() -> Self {
        Self { token: None, is_authenticated: Some(false), user: None, loading: false }
    }

    /// Identity check succeeded for `token`.
    #[must_use]
    pub fn identified(token: String, user: User) -> Self {
        Self { token: Some(token), is_authenticated: Some(true), user: Some(user), loading: false }
    }

    /// Result of committing an auth payload. A payload without a token is a logout.
    #[must_use]
    pub fn committed(payload: Option<&AuthPayload>) -> Self {
        match payload.and_then(|p| p.token().map(|t| (t, p))) {
            Some((token, payload)) => Self {
                token: Some(token.to_owned()),
                is_authenticated: Some(true),
                user: payload.user.clone(),
                loading: false,
            },
            None => Self::signed_out(),
        }
    }

    /// Replace the user record, keeping the token.
    #[must_use]
    pub fn with_user(&self, user: User) -> Self {
        Self { user: Some(user), loading: false, ..self.clone() }
    }

    /// Mark an action as in flight.
    #[must_use]
    pub fn started(&self) -> Self {
        Self { loading: true, ..self.clone() }
    }

    /// Clear the in-flight flag after a failed action. An unresolved session
    /// stays loading until the identity check publishes.
    #[must_use]
    pub fn settled(&self) -> Self {
        Self { loading: !self.is_resolved(), ..self.clone() }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated == Some(true)
    }

    /// True once the first identity check has resolved.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.is_authenticated.is_some()
    }
}
