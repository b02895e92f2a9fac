//! HTTP transport shared by the session store and the service modules.
//!
//! DESIGN
//! ======
//! One `reqwest::Client` per base URL. The bearer credential lives in a
//! shared slot owned by the client: the session store sets or clears it
//! whenever the credential changes, and every request reads the slot when it
//! is built, so the header always reflects the latest credential.
//!
//! Clones share the HTTP pool and the credential slot. `scoped` returns a
//! clone bound to a `CancellationToken`; requests issued through it resolve
//! to `ApiError::Cancelled` once the token fires.
//!
//! No retries, no timeouts, no caching.

use std::sync::{Arc, PoisonError, RwLock};

use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::error::ApiError;

// =============================================================================
// CLIENT
// =============================================================================

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    credential: Arc<RwLock<Option<String>>>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("has_credential", &self.has_credential())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Build a client for the given base URL (e.g. `http://localhost:5000/api`).
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client fails to build.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base_url = parse_base_url(base_url)?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("libris/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url, credential: Arc::new(RwLock::new(None)), cancel: CancellationToken::new() })
    }

    /// Build a client from a resolved config.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        Self::new(&config.base_url)
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// A clone sharing the pool and credential slot, bound to `cancel`.
    #[must_use]
    pub fn scoped(&self, cancel: CancellationToken) -> Self {
        Self { cancel, ..self.clone() }
    }

    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    // -------------------------------------------------------------------------
    // Credential slot
    // -------------------------------------------------------------------------

    /// Install or clear the bearer credential for all subsequent requests.
    pub fn set_credential(&self, token: Option<&str>) {
        let mut slot = self.credential.write().unwrap_or_else(PoisonError::into_inner);
        *slot = token.filter(|t| !t.trim().is_empty()).map(str::to_owned);
    }

    pub fn clear_credential(&self) {
        self.set_credential(None);
    }

    #[must_use]
    pub fn credential(&self) -> Option<String> {
        self.credential
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn has_credential(&self) -> bool {
        self.credential
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    // -------------------------------------------------------------------------
    // Requests
    // -------------------------------------------------------------------------

    /// Absolute URL for the given path segments. Each segment is percent-encoded.
    #[must_use]
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Start a request with the current bearer credential attached.
    #[must_use]
    pub fn request(&self, method: Method, segments: &[&str]) -> RequestBuilder {
        let builder = self.http.request(method, self.endpoint(segments));
        match self.credential() {
            Some(token) => builder.header(AUTHORIZATION, format!("Bearer {token}")),
            None => builder,
        }
    }

    /// `GET` and decode the JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-success status, undecodable
    /// body, or cancellation.
    pub async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        self.send(&Method::GET, segments, self.request(Method::GET, segments)).await
    }

    /// `GET` with query-string parameters.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::get`].
    pub async fn get_with_query<T, Q>(&self, segments: &[&str], query: &Q) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let builder = self.request(Method::GET, segments).query(query);
        self.send(&Method::GET, segments, builder).await
    }

    /// `POST` a JSON body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::get`].
    pub async fn post<T, B>(&self, segments: &[&str], body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let builder = self.request(Method::POST, segments).json(body);
        self.send(&Method::POST, segments, builder).await
    }

    /// `PUT` a JSON body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::get`].
    pub async fn put<T, B>(&self, segments: &[&str], body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let builder = self.request(Method::PUT, segments).json(body);
        self.send(&Method::PUT, segments, builder).await
    }

    /// `PUT` without a body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::get`].
    pub async fn put_empty<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        self.send(&Method::PUT, segments, self.request(Method::PUT, segments)).await
    }

    /// `DELETE` and decode the confirmation body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::get`].
    pub async fn delete<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        self.send(&Method::DELETE, segments, self.request(Method::DELETE, segments)).await
    }

    /// Send a `multipart/form-data` body with the given method.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::get`].
    pub async fn send_multipart<T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        form: reqwest::multipart::Form,
    ) -> Result<T, ApiError> {
        let builder = self.request(method.clone(), segments).multipart(form);
        self.send(&method, segments, builder).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: &Method,
        segments: &[&str],
        builder: RequestBuilder,
    ) -> Result<T, ApiError> {
        let path = segments.join("/");
        tracing::debug!(%method, path = %path, "api request");

        let response = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(ApiError::Cancelled),
            result = builder.send() => result.map_err(|e| ApiError::Request(e.to_string()))?,
        };

        let status = response.status().as_u16();
        let text = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(ApiError::Cancelled),
            result = response.text() => result.map_err(|e| ApiError::Request(e.to_string()))?,
        };

        if !(200..300).contains(&status) {
            tracing::debug!(%method, path = %path, status, "api request rejected");
            return Err(ApiError::Response { status, body: text });
        }

        parse_body(&text)
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ApiError> {
    let url = Url::parse(raw.trim()).map_err(|e| ApiError::InvalidBaseUrl(format!("{raw}: {e}")))?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(ApiError::InvalidBaseUrl(format!("{raw}: not an http(s) base URL")));
    }
    Ok(url)
}

/// Decode a success body. An empty body decodes as JSON `null`.
fn parse_body<T: DeserializeOwned>(text: &str) -> Result<T, ApiError> {
    let text = if text.trim().is_empty() { "null" } else { text };
    serde_json::from_str(text).map_err(|e| ApiError::Parse(e.to_string()))
}

#[cfg(test)]
#[path = "client_test.rs"]
mod client_test;
