//! Catalog service: book CRUD against `/books`.
//!
//! DESIGN
//! ======
//! Every operation returns the decoded response body untouched and
//! propagates errors without interpreting them. Create and update send
//! `multipart/form-data` so cover images can ride along; everything else is
//! JSON. Book ids are path segments and are percent-encoded by the client.

use std::path::Path;

use reqwest::Method;
use reqwest::multipart::{Form, Part};
use serde_json::Value;

use crate::error::ApiError;
use crate::net::client::ApiClient;

// =============================================================================
// QUERY
// =============================================================================

/// Query-string parameters for [`get_books`], sent in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BookQuery {
    params: Vec<(String, String)>,
}

impl BookQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter. Repeating a key sends it more than once.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn search(self, text: impl Into<String>) -> Self {
        self.param("search", text)
    }

    #[must_use]
    pub fn page(self, page: u32) -> Self {
        self.param("page", page.to_string())
    }

    #[must_use]
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

// =============================================================================
// FORM
// =============================================================================

/// A file attached to a book form (e.g. a cover image).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    pub field: String,
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    #[must_use]
    pub fn new(field: impl Into<String>, file_name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { field: field.into(), file_name: file_name.into(), mime: mime.into(), bytes }
    }

    /// Read a file from disk, inferring the MIME type from its extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or has no file name.
    pub async fn from_path(field: impl Into<String>, path: &Path) -> Result<Self, ApiError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ApiError::Attachment(format!("{}: no file name", path.display())))?
            .to_owned();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ApiError::Attachment(format!("{}: {e}", path.display())))?;
        Ok(Self::new(field, file_name, mime_for_path(path), bytes))
    }
}

/// Best-effort MIME type from a file extension.
#[must_use]
pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Multipart body for [`add_book`] and [`update_book`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BookForm {
    fields: Vec<(String, String)>,
    attachments: Vec<Attachment>,
}

impl BookForm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn text(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn attach(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    #[must_use]
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    #[must_use]
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    fn into_multipart(self) -> Result<Form, ApiError> {
        let mut form = Form::new();
        for (key, value) in self.fields {
            form = form.text(key, value);
        }
        for attachment in self.attachments {
            let part = Part::bytes(attachment.bytes)
                .file_name(attachment.file_name)
                .mime_str(&attachment.mime)
                .map_err(|e| ApiError::Attachment(format!("{}: {e}", attachment.mime)))?;
            form = form.part(attachment.field, part);
        }
        Ok(form)
    }
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// `GET /books?<query>`.
///
/// # Errors
///
/// Propagates transport and backend errors.
pub async fn get_books(client: &ApiClient, query: &BookQuery) -> Result<Value, ApiError> {
    client.get_with_query(&["books"], query.params()).await
}

/// `GET /books/:id`.
///
/// # Errors
///
/// Propagates transport and backend errors (`404` for unknown ids).
pub async fn get_book_by_id(client: &ApiClient, book_id: &str) -> Result<Value, ApiError> {
    client.get(&["books", book_id]).await
}

/// `PUT /books/:id/issue`.
///
/// # Errors
///
/// Propagates transport and backend errors.
pub async fn issue_book(client: &ApiClient, book_id: &str) -> Result<Value, ApiError> {
    client.put_empty(&["books", book_id, "issue"]).await
}

/// `PUT /books/:id/return`.
///
/// # Errors
///
/// Propagates transport and backend errors.
pub async fn return_book(client: &ApiClient, book_id: &str) -> Result<Value, ApiError> {
    client.put_empty(&["books", book_id, "return"]).await
}

/// `POST /books/:id/rate {rating}`.
///
/// # Errors
///
/// Propagates transport and backend errors.
pub async fn rate_book(client: &ApiClient, book_id: &str, rating: u8) -> Result<Value, ApiError> {
    client.post(&["books", book_id, "rate"], &serde_json::json!({ "rating": rating })).await
}

/// `POST /books` (multipart).
///
/// # Errors
///
/// Returns an error for malformed attachments, and propagates transport and
/// backend errors.
pub async fn add_book(client: &ApiClient, form: BookForm) -> Result<Value, ApiError> {
    client.send_multipart(Method::POST, &["books"], form.into_multipart()?).await
}

/// `PUT /books/:id` (multipart).
///
/// # Errors
///
/// See [`add_book`].
pub async fn update_book(client: &ApiClient, book_id: &str, form: BookForm) -> Result<Value, ApiError> {
    client.send_multipart(Method::PUT, &["books", book_id], form.into_multipart()?).await
}

/// `DELETE /books/:id`.
///
/// # Errors
///
/// Propagates transport and backend errors.
pub async fn delete_book(client: &ApiClient, book_id: &str) -> Result<Value, ApiError> {
    client.delete(&["books", book_id]).await
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
