//! In-process stub of the chat backend, served by axum on an ephemeral port.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use tokio::net::TcpListener;

#[derive(Debug, Clone)]
pub enum Reply {
    Json { status: u16, body: String },
    /// Answer with `reply` after a delay.
    Delayed(Duration, Box<Reply>),
    /// Never answer.
    Hang,
}

impl Reply {
    pub fn ok(body: &str) -> Self {
        Reply::Json { status: 200, body: body.to_string() }
    }

    pub fn status(status: u16, body: &str) -> Self {
        Reply::Json { status, body: body.to_string() }
    }

    pub fn after(self, delay: Duration) -> Self {
        Reply::Delayed(delay, Box::new(self))
    }
}

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: String,
}

impl Recorded {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

#[derive(Clone)]
struct Stub {
    chat: Reply,
    clear: Reply,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

pub struct StubServer {
    pub url: String,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl StubServer {
    pub fn hits(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last(&self) -> Recorded {
        self.requests.lock().unwrap().last().cloned().expect("no request recorded")
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests.lock().unwrap().iter().map(|r| r.path.clone()).collect()
    }
}

/// Serve `reply` on every route.
pub async fn spawn(reply: Reply) -> StubServer {
    spawn_routes(reply.clone(), reply).await
}

/// Serve `chat` on `/api/chat` and `/ask`, and `clear` on `/api/clear`.
pub async fn spawn_routes(chat: Reply, clear: Reply) -> StubServer {
    let requests = Arc::new(Mutex::new(Vec::new()));
    let stub = Stub { chat, clear, requests: requests.clone() };

    let app = Router::new()
        .route("/api/chat", post(record))
        .route("/api/clear", post(record))
        .route("/ask", post(record))
        .with_state(stub);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    StubServer {
        url: format!("http://127.0.0.1:{}", port),
        requests,
    }
}

/// An address nothing is listening on.
pub async fn closed_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

async fn record(
    State(stub): State<Stub>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let path = uri.path().to_string();
    let reply = if path == "/api/clear" { stub.clear.clone() } else { stub.chat.clone() };
    stub.requests.lock().unwrap().push(Recorded { method, path, headers, body });
    respond(reply).await
}

async fn respond(mut reply: Reply) -> Response {
    loop {
        match reply {
            Reply::Json { status, body } => {
                let status = StatusCode::from_u16(status).unwrap();
                return (status, [(header::CONTENT_TYPE, "application/json")], body).into_response();
            }
            Reply::Delayed(delay, inner) => {
                tokio::time::sleep(delay).await;
                reply = *inner;
            }
            Reply::Hang => return std::future::pending::<Response>().await,
        }
    }
}
