//! Session store: the single owner of "who is logged in".
//!
//! DESIGN
//! ======
//! `SessionStore` is a cheap cloneable handle passed to whoever needs auth
//! state; there is no global. State lives in a `watch` channel so consumers
//! can subscribe to every committed `Session`.
//!
//! Token changes go through one path, `commit`: it writes or deletes the
//! durable credential, installs or clears the transport credential, then
//! publishes the pure `Session::committed` transition.
//!
//! CANCELLATION
//! ============
//! The store owns a child of the client's cancellation token and issues all
//! requests through a client scoped to it. After `shutdown`, in-flight
//! actions resolve to `ApiError::Cancelled` and publish nothing.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use std::sync::Arc;

use tokio::sync::{OnceCell, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::session::Session;
use crate::error::ApiError;
use crate::net::client::ApiClient;
use crate::net::types::{AuthPayload, Credentials, ProfileUpdate, Registration, User};
use crate::services::auth;
use crate::storage::CredentialStore;

#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

struct Inner {
    client: ApiClient,
    storage: Arc<dyn CredentialStore>,
    state: watch::Sender<Session>,
    initialized: OnceCell<()>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("SessionStore")
            .field("is_authenticated", &state.is_authenticated)
            .field("loading", &state.loading)
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Create a store over `client` and `storage`.
    ///
    /// The durable credential is read immediately so the pending state
    /// carries it; nothing is sent until [`SessionStore::initialize`].
    pub fn new(client: ApiClient, storage: impl CredentialStore + 'static) -> Self {
        let cancel = client.cancellation().child_token();
        let client = client.scoped(cancel.clone());
        let storage: Arc<dyn CredentialStore> = Arc::new(storage);

        let token = storage.load().unwrap_or_else(|e| {
            warn!(error = %e, "failed to read stored credential");
            None
        });
        let (state, _) = watch::channel(Session::pending(token));

        Self { inner: Arc::new(Inner { client, storage, state, initialized: OnceCell::new(), cancel }) }
    }

    /// The transport this store authenticates. Catalog calls should use it so
    /// they carry the same credential and cancellation.
    #[must_use]
    pub fn client(&self) -> &ApiClient {
        &self.inner.client
    }

    /// Snapshot of the current session.
    #[must_use]
    pub fn state(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    /// Receiver that observes every committed session.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }

    /// Cancel in-flight actions and stop all further state updates from them.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    // =========================================================================
    // ACTIONS
    // =========================================================================

    /// Restore the session from the durable credential. Runs once per store;
    /// later calls wait for the first run and return the current state.
    ///
    /// Without a stored credential no request is made. A rejected credential
    /// is deleted and the session becomes signed out; this is never an error.
    pub async fn initialize(&self) -> Session {
        self.inner
            .initialized
            .get_or_init(|| async {
                self.load_user().await;
            })
            .await;
        self.state()
    }

    /// Re-run the identity check with the stored credential.
    pub async fn reload(&self) -> Session {
        self.load_user().await
    }

    /// Log in with email and password.
    ///
    /// # Errors
    ///
    /// Returns the backend rejection or transport error; token and user are
    /// left unchanged and `loading` is cleared.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ApiError> {
        self.ensure_live()?;
        self.inner.state.send_modify(|s| *s = s.started());
        let result = auth::login(&self.inner.client, &Credentials::new(email, password)).await;
        self.finish_auth(result, "login")
    }

    /// Register a new account and log in as it.
    ///
    /// # Errors
    ///
    /// Same contract as [`SessionStore::login`].
    pub async fn register(&self, registration: &Registration) -> Result<Session, ApiError> {
        self.ensure_live()?;
        self.inner.state.send_modify(|s| *s = s.started());
        let result = auth::register(&self.inner.client, registration).await;
        self.finish_auth(result, "register")
    }

    /// Forget the session locally. No request is made.
    ///
    /// # Errors
    ///
    /// Returns an error if the durable credential could not be deleted; the
    /// in-memory session and transport credential are cleared regardless.
    pub fn logout(&self) -> Result<(), ApiError> {
        let result = self.commit(None).map(|_| ());
        match &result {
            Ok(()) => info!("logged out"),
            Err(e) => {
                warn!(error = %e, "logged out; failed to delete stored credential");
                self.inner.client.clear_credential();
                self.inner.state.send_replace(Session::signed_out());
            }
        }
        result
    }

    /// Update profile fields and merge the returned user into the session.
    ///
    /// # Errors
    ///
    /// Returns the backend rejection or transport error; the session is left
    /// unchanged. If the session changed while the request was in flight the
    /// updated user is returned but not published.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ApiError> {
        self.ensure_live()?;
        let token = self.inner.client.credential();
        let user = auth::update_profile(&self.inner.client, update).await?;
        self.ensure_live()?;

        let current = self.inner.client.credential();
        let published = self.inner.state.send_if_modified(|s| {
            if token.is_none() || current != token || !s.is_authenticated() {
                return false;
            }
            *s = s.with_user(user.clone());
            true
        });
        if published {
            debug!(user = ?user.key(), "profile updated");
        } else {
            debug!("session changed during profile update; not publishing user");
        }
        Ok(user)
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn ensure_live(&self) -> Result<(), ApiError> {
        if self.inner.cancel.is_cancelled() { Err(ApiError::Cancelled) } else { Ok(()) }
    }

    fn finish_auth(&self, result: Result<AuthPayload, ApiError>, action: &'static str) -> Result<Session, ApiError> {
        if self.inner.cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        match result {
            Ok(payload) => {
                let session = self.commit(Some(&payload)).inspect_err(|_| {
                    self.inner.state.send_modify(|s| *s = s.settled());
                })?;
                info!(action, user = ?session.user.as_ref().and_then(User::key), "session committed");
                Ok(session)
            }
            Err(e) => {
                debug!(action, error = %e, "auth action failed");
                self.inner.state.send_modify(|s| *s = s.settled());
                Err(e)
            }
        }
    }

    /// The single mutation path for token changes.
    fn commit(&self, payload: Option<&AuthPayload>) -> Result<Session, ApiError> {
        match payload.and_then(AuthPayload::token) {
            Some(token) => {
                self.inner.storage.save(token)?;
                self.inner.client.set_credential(Some(token));
            }
            None => {
                self.inner.storage.clear()?;
                self.inner.client.clear_credential();
            }
        }
        let session = Session::committed(payload);
        self.inner.state.send_replace(session.clone());
        Ok(session)
    }

    async fn load_user(&self) -> Session {
        if self.inner.cancel.is_cancelled() {
            return self.state();
        }

        let token = self.inner.storage.load().unwrap_or_else(|e| {
            warn!(error = %e, "failed to read stored credential");
            None
        });
        let Some(token) = token else {
            self.inner.client.clear_credential();
            self.inner.state.send_replace(Session::signed_out());
            debug!("no stored credential");
            return self.state();
        };

        self.inner.client.set_credential(Some(&token));
        self.inner.state.send_modify(|s| *s = s.started());

        let result = auth::me(&self.inner.client).await;
        if self.inner.cancel.is_cancelled() {
            return self.state();
        }
        // A login or logout that finished while the check was in flight wins.
        if self.inner.client.credential().as_deref() != Some(token.as_str()) {
            debug!("credential changed during identity check; discarding result");
            return self.state();
        }

        match result {
            Ok(user) => {
                info!(user = ?user.key(), "session restored");
                self.inner.state.send_replace(Session::identified(token, user));
            }
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "stored credential rejected; signing out");
                if let Err(e) = self.inner.storage.clear() {
                    warn!(error = %e, "failed to delete stored credential");
                }
                self.inner.client.clear_credential();
                self.inner.state.send_replace(Session::signed_out());
            }
        }
        self.state()
    }
}
