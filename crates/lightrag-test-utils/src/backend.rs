//! [`StubBackend`]: an in-process stand-in for the LightRAG HTTP server.
//!
//! The stub binds an ephemeral localhost port, records every request it
//! receives and answers with:
//!
//! 1. an override registered through [`StubBackend::respond`], if one matches
//!    the method and path, otherwise
//! 2. a small built-in model of the LightRAG API: an in-memory document list
//!    behind `/documents*`, echoing answers behind `/query` (chunked when the
//!    body asks for `stream: true`), and a generic `{"status": "ok"}` for
//!    everything else.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A request as seen by the stub
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    /// Raw query string, without the leading `?`
    pub query: Option<String>,
    /// Header names are lowercase
    pub headers: HashMap<String, String>,
    /// Parsed JSON body; `None` when the body was empty
    pub body: Option<Value>,
}

impl RecordedRequest {
    /// Value of a header, looked up case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Decoded query parameters
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        self.query
            .as_deref()
            .unwrap_or_default()
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| match pair.split_once('=') {
                Some((k, v)) => (k.to_string(), v.to_string()),
                None => (pair.to_string(), String::new()),
            })
            .collect()
    }
}

/// A canned response registered for one method and path
#[derive(Debug, Clone)]
pub enum StubResponse {
    /// JSON body with the given status
    Json(StatusCode, Value),
    /// Raw text body with the given status (useful for malformed JSON)
    Text(StatusCode, String),
    /// `200 OK` whose body is streamed as the given chunks, in order
    Chunks(Vec<String>),
    /// Wait before answering with the inner response
    Delay(Duration, Box<StubResponse>),
}

#[derive(Default)]
struct StubState {
    requests: Mutex<Vec<RecordedRequest>>,
    overrides: Mutex<HashMap<(String, String), StubResponse>>,
    documents: Mutex<Vec<Value>>,
}

/// Running stub server; shut down when dropped
pub struct StubBackend {
    addr: SocketAddr,
    state: Arc<StubState>,
    handle: JoinHandle<()>,
}

impl StubBackend {
    /// Bind an ephemeral port and start serving
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("StubBackend::start: failed to bind listener");
        let addr = listener
            .local_addr()
            .expect("StubBackend::start: listener has no local address");

        let state = Arc::new(StubState::default());
        let app = Router::new().fallback(handle_request).with_state(state.clone());

        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    /// Base URL of the stub, e.g. `http://127.0.0.1:40123`
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Register a response for `method path`, replacing the built-in behaviour
    pub fn respond(&self, method: &str, path: &str, response: StubResponse) {
        self.state
            .overrides
            .lock()
            .expect("stub state poisoned")
            .insert((method.to_ascii_uppercase(), path.to_string()), response);
    }

    /// Every request received so far, in arrival order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state
            .requests
            .lock()
            .expect("stub state poisoned")
            .clone()
    }

    /// The most recent request
    pub fn last_request(&self) -> Option<RecordedRequest> {
        self.requests().pop()
    }

    /// Documents currently held by the built-in document model
    pub fn documents(&self) -> Vec<Value> {
        self.state
            .documents
            .lock()
            .expect("stub state poisoned")
            .clone()
    }
}

impl Drop for StubBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// A localhost URL nothing is listening on, for connection-refused tests
pub async fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("unreachable_url: failed to bind listener");
    let addr = listener
        .local_addr()
        .expect("unreachable_url: listener has no local address");
    drop(listener);
    format!("http://{}", addr)
}

async fn handle_request(
    State(state): State<Arc<StubState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let body_json = if body.is_empty() {
        None
    } else {
        Some(
            serde_json::from_slice(&body)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into_owned())),
        )
    };

    let recorded = RecordedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers: headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect(),
        body: body_json,
    };

    state
        .requests
        .lock()
        .expect("stub state poisoned")
        .push(recorded.clone());

    let key = (recorded.method.clone(), recorded.path.clone());
    let override_response = state
        .overrides
        .lock()
        .expect("stub state poisoned")
        .get(&key)
        .cloned();

    match override_response {
        Some(response) => render(response).await,
        None => render(builtin(&state, &recorded)).await,
    }
}

async fn render(mut response: StubResponse) -> Response {
    while let StubResponse::Delay(delay, inner) = response {
        tokio::time::sleep(delay).await;
        response = *inner;
    }
    render_ready(response)
}

fn render_ready(response: StubResponse) -> Response {
    match response {
        StubResponse::Delay(_, inner) => render_ready(*inner),
        StubResponse::Json(status, value) => (status, axum::Json(value)).into_response(),
        StubResponse::Text(status, text) => {
            (status, [(header::CONTENT_TYPE, "text/plain")], text).into_response()
        }
        StubResponse::Chunks(chunks) => {
            let stream = futures::stream::iter(
                chunks
                    .into_iter()
                    .map(|chunk| Ok::<_, std::io::Error>(Bytes::from(chunk))),
            );
            (
                [(header::CONTENT_TYPE, "application/x-ndjson")],
                Body::from_stream(stream),
            )
                .into_response()
        }
    }
}

fn builtin(state: &StubState, request: &RecordedRequest) -> StubResponse {
    let body = request.body.clone().unwrap_or(Value::Null);
    let mut documents = state.documents.lock().expect("stub state poisoned");
    let segments: Vec<&str> = request.path.trim_matches('/').split('/').collect();

    match (request.method.as_str(), segments.as_slice()) {
        ("POST", ["documents", "text"]) => {
            let id = format!("doc-{}", documents.len() + 1);
            documents.push(json!({
                "id": id,
                "content": body["text"],
                "description": body["description"],
                "status": "processed",
            }));
            StubResponse::Json(
                StatusCode::OK,
                json!({"status": "success", "message": "Text inserted", "document_id": id}),
            )
        }
        ("POST", ["documents", "texts"]) => {
            let texts = body["texts"].as_array().cloned().unwrap_or_default();
            for text in &texts {
                let id = format!("doc-{}", documents.len() + 1);
                documents.push(json!({
                    "id": id,
                    "content": text["content"],
                    "status": "processed",
                }));
            }
            StubResponse::Json(
                StatusCode::OK,
                json!({"status": "success", "inserted": texts.len()}),
            )
        }
        ("GET", ["documents"]) => {
            StubResponse::Json(StatusCode::OK, json!({"documents": documents.clone()}))
        }
        ("DELETE", ["documents"]) => {
            documents.clear();
            StubResponse::Json(
                StatusCode::OK,
                json!({"status": "success", "message": "All documents cleared"}),
            )
        }
        ("DELETE", ["documents", id]) => {
            let before = documents.len();
            documents.retain(|doc| doc["id"] != *id);
            if documents.len() == before {
                StubResponse::Json(
                    StatusCode::NOT_FOUND,
                    json!({"detail": format!("Document {} not found", id)}),
                )
            } else {
                StubResponse::Json(
                    StatusCode::OK,
                    json!({"status": "success", "document_id": id}),
                )
            }
        }
        ("POST", ["query"]) => {
            let query = body["query"].as_str().unwrap_or_default().to_string();
            if body["stream"] == json!(true) {
                StubResponse::Chunks(vec![
                    "Streaming ".to_string(),
                    "answer ".to_string(),
                    "for: ".to_string(),
                    query,
                ])
            } else {
                StubResponse::Json(
                    StatusCode::OK,
                    json!({"response": format!("Answer for: {}", query), "mode": body["mode"]}),
                )
            }
        }
        _ => StubResponse::Json(
            StatusCode::OK,
            json!({"status": "ok", "method": request.method, "path": request.path}),
        ),
    }
}
