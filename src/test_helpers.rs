//! In-process fake of the library backend for HTTP-level tests.
//!
//! Binds `127.0.0.1:0`, serves the `/api/auth` and `/api/books` routes with
//! canned behaviour, and records the method, path and `Authorization`
//! header of every request it sees.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Multipart, Path, Query, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post, put};
use axum::Router;
use serde_json::{Map, Value, json};

use crate::net::client::ApiClient;

pub const VALID_EMAIL: &str = "a@b.com";
pub const VALID_PASSWORD: &str = "pw";
pub const LOGIN_TOKEN: &str = "T";
pub const REGISTER_TOKEN: &str = "R";
pub const TAKEN_EMAIL: &str = "taken@b.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
}

pub struct BackendState {
    requests: Mutex<Vec<Recorded>>,
    profile: Mutex<Value>,
    me_delay_ms: AtomicU64,
}

impl BackendState {
    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<Recorded> {
        self.requests.lock().unwrap().last().cloned()
    }

    /// Delay every `/auth/me` response, reads and updates alike.
    pub fn delay_me(&self, delay: Duration) {
        self.me_delay_ms
            .store(u64::try_from(delay.as_millis()).unwrap(), Ordering::SeqCst);
    }

    async fn me_delay(&self) {
        let delay = self.me_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }
}

pub struct FakeBackend {
    pub base_url: String,
    pub state: Arc<BackendState>,
}

impl FakeBackend {
    pub fn client(&self) -> ApiClient {
        ApiClient::new(&self.base_url).unwrap()
    }
}

/// Start a fake backend on an ephemeral port. The base URL includes `/api`.
pub async fn spawn_backend() -> FakeBackend {
    let state = Arc::new(BackendState {
        requests: Mutex::new(Vec::new()),
        profile: Mutex::new(json!({ "id": 1, "name": "Ada", "email": VALID_EMAIL })),
        me_delay_ms: AtomicU64::new(0),
    });

    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/auth/me", get(me).put(update_me))
        .route("/api/books", get(list_books).post(create_book))
        .route("/api/books/{id}", get(get_book).put(update_book).delete(delete_book))
        .route("/api/books/{id}/issue", put(issue_book))
        .route("/api/books/{id}/return", put(return_book))
        .route("/api/books/{id}/rate", post(rate_book))
        .route("/api/empty", get(empty))
        .layer(middleware::from_fn_with_state(state.clone(), record))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FakeBackend { base_url: format!("http://{addr}/api"), state }
}

/// Base URL of a port nothing listens on.
pub async fn dead_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}/api")
}

// =============================================================================
// MIDDLEWARE
// =============================================================================

async fn record(State(state): State<Arc<BackendState>>, req: Request, next: Next) -> Response {
    let authorization = req
        .headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    state.requests.lock().unwrap().push(Recorded {
        method: req.method().to_string(),
        path: req.uri().path().to_owned(),
        authorization,
    });
    next.run(req).await
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

fn authorized(headers: &HeaderMap) -> bool {
    matches!(bearer(headers), Some(LOGIN_TOKEN | REGISTER_TOKEN))
}

fn reject(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

// =============================================================================
// AUTH
// =============================================================================

async fn login(State(state): State<Arc<BackendState>>, Json(body): Json<Value>) -> Response {
    let email = body.get("email").and_then(Value::as_str);
    let password = body.get("password").and_then(Value::as_str);
    if email != Some(VALID_EMAIL) || password != Some(VALID_PASSWORD) {
        return reject(StatusCode::UNAUTHORIZED, "Invalid credentials");
    }
    let user = state.profile.lock().unwrap().clone();
    Json(json!({ "token": LOGIN_TOKEN, "user": user })).into_response()
}

async fn register(Json(body): Json<Value>) -> Response {
    let Some(email) = body.get("email").and_then(Value::as_str) else {
        return reject(StatusCode::BAD_REQUEST, "Email is required");
    };
    if email == TAKEN_EMAIL {
        return reject(StatusCode::BAD_REQUEST, "User already exists");
    }
    let name = body.get("name").cloned().unwrap_or(Value::Null);
    Json(json!({ "token": REGISTER_TOKEN, "user": { "id": 2, "name": name, "email": email } })).into_response()
}

async fn me(State(state): State<Arc<BackendState>>, headers: HeaderMap) -> Response {
    state.me_delay().await;
    if !authorized(&headers) {
        return reject(StatusCode::UNAUTHORIZED, "Token is not valid");
    }
    Json(state.profile.lock().unwrap().clone()).into_response()
}

async fn update_me(State(state): State<Arc<BackendState>>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    state.me_delay().await;
    if !authorized(&headers) {
        return reject(StatusCode::UNAUTHORIZED, "Token is not valid");
    }
    if body.get("email").and_then(Value::as_str) == Some("") {
        return reject(StatusCode::BAD_REQUEST, "Email cannot be empty");
    }
    let mut profile = state.profile.lock().unwrap();
    if let (Some(target), Some(fields)) = (profile.as_object_mut(), body.as_object()) {
        for (key, value) in fields {
            if key != "password" {
                target.insert(key.clone(), value.clone());
            }
        }
    }
    Json(profile.clone()).into_response()
}

// =============================================================================
// BOOKS
// =============================================================================

async fn list_books(Query(params): Query<Vec<(String, String)>>) -> Json<Value> {
    let query: Map<String, Value> = params
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();
    Json(json!([
        { "id": "b1", "title": "Dune", "query": query },
        { "id": "b2", "title": "Emma", "query": query },
    ]))
}

async fn get_book(Path(id): Path<String>) -> Response {
    if id == "missing" {
        return reject(StatusCode::NOT_FOUND, "Book not found");
    }
    Json(json!({ "id": id, "title": "Dune" })).into_response()
}

async fn issue_book(Path(id): Path<String>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return reject(StatusCode::UNAUTHORIZED, "No token, authorization denied");
    }
    Json(json!({ "id": id, "status": "issued" })).into_response()
}

async fn return_book(Path(id): Path<String>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return reject(StatusCode::UNAUTHORIZED, "No token, authorization denied");
    }
    Json(json!({ "id": id, "status": "available" })).into_response()
}

async fn rate_book(Path(id): Path<String>, Json(body): Json<Value>) -> Response {
    match body.get("rating").and_then(Value::as_u64) {
        Some(rating @ 1..=5) => Json(json!({ "id": id, "rating": rating })).into_response(),
        _ => reject(StatusCode::BAD_REQUEST, "Rating must be between 1 and 5"),
    }
}

async fn create_book(headers: HeaderMap, multipart: Multipart) -> Response {
    if !authorized(&headers) {
        return reject(StatusCode::UNAUTHORIZED, "No token, authorization denied");
    }
    let mut body = describe_multipart(multipart).await;
    body["id"] = json!("new");
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn update_book(Path(id): Path<String>, headers: HeaderMap, multipart: Multipart) -> Response {
    if !authorized(&headers) {
        return reject(StatusCode::UNAUTHORIZED, "No token, authorization denied");
    }
    let mut body = describe_multipart(multipart).await;
    body["id"] = json!(id);
    Json(body).into_response()
}

async fn delete_book(Path(id): Path<String>, headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return reject(StatusCode::UNAUTHORIZED, "No token, authorization denied");
    }
    Json(json!({ "message": "Book removed", "id": id })).into_response()
}

async fn empty() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn describe_multipart(mut multipart: Multipart) -> Value {
    let mut fields = Map::new();
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_owned();
        match field.file_name().map(str::to_owned) {
            Some(file_name) => {
                let content_type = field.content_type().map(str::to_owned);
                let size = field.bytes().await.unwrap().len();
                files.push(json!({
                    "field": name,
                    "file_name": file_name,
                    "content_type": content_type,
                    "size": size,
                }));
            }
            None => {
                let text = field.text().await.unwrap();
                fields.insert(name, Value::String(text));
            }
        }
    }
    json!({ "fields": fields, "files": files })
}
