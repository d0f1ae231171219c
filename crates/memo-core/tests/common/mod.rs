//! Local ETAPI stand-in for integration tests
//!
//! Serves canned responses per path and records every request it sees.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;

/// A request as received by the mock
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub body: String,
}

impl Recorded {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("request body is JSON")
    }
}

#[derive(Debug, Clone)]
struct Canned {
    status: u16,
    body: String,
    content_type: &'static str,
    delay: Option<Duration>,
}

#[derive(Default)]
struct Inner {
    routes: HashMap<(Method, String), Canned>,
    requests: Vec<Recorded>,
}

#[derive(Clone, Default)]
pub struct MockEtapi {
    inner: Arc<Mutex<Inner>>,
}

impl MockEtapi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn json(self, method: Method, path: &str, status: u16, body: serde_json::Value) -> Self {
        self.route(method, path, status, body.to_string(), "application/json", None)
    }

    pub fn text(self, method: Method, path: &str, status: u16, body: &str) -> Self {
        self.route(method, path, status, body.to_string(), "text/html", None)
    }

    pub fn slow(self, method: Method, path: &str, delay: Duration) -> Self {
        self.route(method, path, 200, String::new(), "text/html", Some(delay))
    }

    fn route(
        self,
        method: Method,
        path: &str,
        status: u16,
        body: String,
        content_type: &'static str,
        delay: Option<Duration>,
    ) -> Self {
        self.inner.lock().unwrap().routes.insert(
            (method, path.to_string()),
            Canned {
                status,
                body,
                content_type,
                delay,
            },
        );
        self
    }

    /// Bind to an ephemeral port and return the base URL
    pub async fn start(&self) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let addr = listener.local_addr().expect("mock server address");

        let app = Router::new().fallback(handle).with_state(self.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock server");
        });

        format!("http://{}", addr)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.inner.lock().unwrap().requests.clone()
    }

    pub fn requests_to(&self, path_prefix: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path.starts_with(path_prefix))
            .collect()
    }
}

async fn handle(
    State(mock): State<MockEtapi>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let canned = {
        let mut inner = mock.inner.lock().unwrap();
        inner.requests.push(Recorded {
            method: method.clone(),
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
            authorization: headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            body,
        });
        inner.routes.get(&(method, uri.path().to_string())).cloned()
    };

    let Some(canned) = canned else {
        return (StatusCode::NOT_FOUND, "no such route").into_response();
    };

    if let Some(delay) = canned.delay {
        tokio::time::sleep(delay).await;
    }

    Response::builder()
        .status(canned.status)
        .header(header::CONTENT_TYPE, canned.content_type)
        .body(Body::from(canned.body))
        .expect("valid response")
}
