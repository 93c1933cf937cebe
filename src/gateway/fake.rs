use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use tokio::{net::TcpListener, task::JoinHandle};

use crate::utils::sync::lock;

/// What the fake device has stored so far.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeState {
    pub(crate) morse: Option<String>,
    pub(crate) morse_content_type: Option<String>,
    pub(crate) pattern: Option<Value>,
    pub(crate) speaker: Option<Value>,
}

type Shared = Arc<Mutex<FakeState>>;

/// In-process stand-in for the device web server, bound to a random port.
pub(crate) struct FakeGateway {
    addr: SocketAddr,
    state: Shared,
    server: JoinHandle<()>,
}

impl FakeGateway {
    pub(crate) async fn start() -> Self {
        let state: Shared = Arc::default();
        let app = Router::new()
            .route("/morseMessage", get(get_morse).post(post_morse))
            .route("/pattern", get(get_pattern).post(post_pattern))
            .route("/saveSpeakerData", post(post_speaker))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            state,
            server,
        }
    }

    pub(crate) fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub(crate) fn state(&self) -> FakeState {
        lock(&self.state).clone()
    }

    pub(crate) fn set_morse(&self, text: &str) {
        lock(&self.state).morse = Some(text.to_string());
    }

    pub(crate) fn set_pattern(&self, pattern: Value) {
        lock(&self.state).pattern = Some(pattern);
    }
}

impl Drop for FakeGateway {
    fn drop(&mut self) {
        self.server.abort();
    }
}

async fn get_morse(State(state): State<Shared>) -> Response {
    let morse = lock(&state).morse.clone();
    match morse {
        Some(text) => text.into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn post_morse(State(state): State<Shared>, headers: HeaderMap, body: String) -> StatusCode {
    let mut guard = lock(&state);
    guard.morse = Some(body);
    guard.morse_content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    StatusCode::OK
}

async fn get_pattern(State(state): State<Shared>) -> Response {
    let pattern = lock(&state).pattern.clone();
    match pattern {
        Some(pattern) => Json(pattern).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn post_pattern(State(state): State<Shared>, Json(body): Json<Value>) -> StatusCode {
    lock(&state).pattern = Some(body);
    StatusCode::OK
}

async fn post_speaker(State(state): State<Shared>, Json(body): Json<Value>) -> StatusCode {
    lock(&state).speaker = Some(body);
    StatusCode::OK
}
