//! Fake LLM vendor for integration tests.
//!
//! Serves a scripted list of `(status, body)` replies in order on every path
//! (the last reply repeats), and records each request URI.

#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use axum::{
    extract::State,
    http::{header, StatusCode, Uri},
    response::IntoResponse,
    Router,
};
use serde_json::json;
use tokio::net::TcpListener;

pub const ONE_QUESTION: &str = r#"[{"question":"Hello","answer":"Bonjour","options":["Bonjour","Salut"],"direction":"en-to-target","type":"multiple-choice","questionLanguage":"en","explanation":"A common greeting."}]"#;

#[derive(Clone)]
struct Script {
    replies: Arc<Vec<(u16, String)>>,
    calls: Arc<AtomicUsize>,
    uris: Arc<Mutex<Vec<String>>>,
}

pub struct FakeVendor {
    pub base_url: String,
    calls: Arc<AtomicUsize>,
    uris: Arc<Mutex<Vec<String>>>,
}

impl FakeVendor {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn uris(&self) -> Vec<String> {
        self.uris.lock().unwrap().clone()
    }
}

async fn reply(State(s): State<Script>, uri: Uri) -> impl IntoResponse {
    s.uris.lock().unwrap().push(uri.to_string());
    let i = s.calls.fetch_add(1, Ordering::SeqCst);
    let (status, body) = s.replies[i.min(s.replies.len() - 1)].clone();
    (
        StatusCode::from_u16(status).unwrap(),
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
}

pub async fn spawn_vendor(replies: Vec<(u16, String)>) -> FakeVendor {
    let script = Script {
        replies: Arc::new(replies),
        calls: Arc::new(AtomicUsize::new(0)),
        uris: Arc::new(Mutex::new(Vec::new())),
    };
    let vendor = FakeVendor {
        base_url: String::new(),
        calls: script.calls.clone(),
        uris: script.uris.clone(),
    };
    let app = Router::new().fallback(reply).with_state(script);
    let base_url = serve(app).await;
    FakeVendor { base_url, ..vendor }
}

/// Bind on an ephemeral port and return the base URL.
pub async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Chat-completions success body carrying `content`.
pub fn chat(content: &str) -> (u16, String) {
    (200, json!({ "choices": [{ "message": { "content": content } }] }).to_string())
}

/// Gemini `generateContent` success body carrying `text`.
pub fn gemini(text: &str) -> (u16, String) {
    (200, json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] }).to_string())
}

pub fn vendor_error(status: u16, message: &str) -> (u16, String) {
    (status, json!({ "error": { "message": message } }).to_string())
}
