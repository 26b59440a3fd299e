//! In-process mock of the admin API, used by client and session tests.
//!
//! Binds an axum router to `127.0.0.1:0` and records every request's method,
//! path, raw query and body. Unconfigured paths answer `404` with a failed
//! envelope.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use serde_json::{json, Value};

use crate::config::InstanceRecord;

/// One request as seen by the mock.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub body: Vec<u8>,
}

impl Recorded {
    /// Decoded value of a query parameter.
    pub fn param(&self, name: &str) -> Option<String> {
        let query = self.query.as_deref()?;
        let url = reqwest::Url::parse(&format!("http://mock/?{query}")).ok()?;
        url.query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    }
}

#[derive(Default)]
struct MockState {
    responses: Mutex<HashMap<String, (u16, String)>>,
    delays: Mutex<HashMap<String, Duration>>,
    requests: Mutex<Vec<Recorded>>,
}

pub struct MockAdmin {
    port: u16,
    state: Arc<MockState>,
}

impl MockAdmin {
    pub const SECRET: &'static str = "s3cret";

    pub async fn spawn() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let state = Arc::new(MockState::default());
        let app = Router::new().fallback(handle).with_state(Arc::clone(&state));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { port, state }
    }

    /// Record pointing at this mock.
    pub fn instance(&self) -> InstanceRecord {
        InstanceRecord {
            address: "127.0.0.1".into(),
            port: self.port,
            secret: Self::SECRET.into(),
        }
    }

    pub fn respond(&self, path: &str, status: u16, body: Value) {
        self.respond_raw(path, status, &body.to_string());
    }

    pub fn respond_raw(&self, path: &str, status: u16, body: &str) {
        self.state
            .responses
            .lock()
            .unwrap()
            .insert(path.to_string(), (status, body.to_string()));
    }

    pub fn delay(&self, path: &str, delay: Duration) {
        self.state
            .delays
            .lock()
            .unwrap()
            .insert(path.to_string(), delay);
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.requests.lock().unwrap().clone()
    }
}

async fn handle(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    state.requests.lock().unwrap().push(Recorded {
        method: method.to_string(),
        path: path.clone(),
        query: uri.query().map(str::to_string),
        body: body.to_vec(),
    });

    let delay = state.delays.lock().unwrap().get(&path).copied();
    if let Some(d) = delay {
        tokio::time::sleep(d).await;
    }

    let canned = state.responses.lock().unwrap().get(&path).cloned();
    let (status, body) = canned.unwrap_or_else(|| {
        (
            404,
            json!({"data": null, "message": "not found", "succeeded": false}).to_string(),
        )
    });
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}
