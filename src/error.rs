//! Client error type shared by the transport, services, and session store.
//!
//! DESIGN
//! ======
//! The backend does not distinguish failures structurally, so every rejected
//! call surfaces as one `ApiError`. The `Response` variant keeps the raw
//! status and body; helpers classify it (auth rejection, validation,
//! not-found) for callers that want to render a message.

/// Errors produced by API client operations.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The configured base URL could not be parsed.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// The request never produced a response (DNS, connect, reset, ...).
    #[error("API request failed: {0}")]
    Request(String),

    /// The backend returned a non-success HTTP status.
    #[error("API response error: status {status}")]
    Response { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("API response parse failed: {0}")]
    Parse(String),

    /// The durable credential could not be read or written.
    #[error("credential storage failed: {0}")]
    Storage(#[from] std::io::Error),

    /// An attached file could not be read or described.
    #[error("invalid attachment: {0}")]
    Attachment(String),

    /// The caller's lifetime ended before the request completed.
    #[error("request cancelled")]
    Cancelled,
}

impl ApiError {
    /// Stable machine-readable code for logs and CLI output.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidBaseUrl(_) => "E_INVALID_BASE_URL",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
            Self::Request(_) => "E_API_REQUEST",
            Self::Response { status: 401 | 403, .. } => "E_UNAUTHORIZED",
            Self::Response { status: 404, .. } => "E_NOT_FOUND",
            Self::Response { status: 400 | 409 | 422, .. } => "E_VALIDATION",
            Self::Response { .. } => "E_API_RESPONSE",
            Self::Parse(_) => "E_API_PARSE",
            Self::Storage(_) => "E_STORAGE",
            Self::Attachment(_) => "E_ATTACHMENT",
            Self::Cancelled => "E_CANCELLED",
        }
    }

    /// HTTP status of a backend rejection, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Response { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for expired or invalid credentials.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Human-readable message from the backend error payload.
    ///
    /// Looks for `message`, then `error`, then `msg` in a JSON body and falls
    /// back to the raw body text. Returns `None` for non-response errors or
    /// an empty body.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        let Self::Response { body, .. } = self else {
            return None;
        };
        if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
            for key in ["message", "error", "msg"] {
                if let Some(text) = map.get(key).and_then(serde_json::Value::as_str) {
                    return Some(text.to_owned());
                }
            }
        }
        let trimmed = body.trim();
        if trimmed.is_empty() { None } else { Some(trimmed.to_owned()) }
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
