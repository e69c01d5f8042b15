#![allow(dead_code)]

use std::{
    collections::HashMap,
    io::Write as _,
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering::SeqCst},
        Arc, Mutex,
    },
};

use axum::{
    extract::State,
    http::{Method, StatusCode, Uri},
    Router,
};
use locus_config::{ConfigurationLoader, GenericConfiguration};
use tempfile::NamedTempFile;
use tokio::net::TcpListener;

#[derive(Clone)]
struct CannedResponse {
    status: StatusCode,
    body: String,
}

#[derive(Clone, Default)]
struct CannedState {
    routes: Arc<Mutex<HashMap<(Method, String), CannedResponse>>>,
    requests: Arc<AtomicUsize>,
}

/// An HTTP server that answers every request for a known route with a canned response, and 404 otherwise.
pub struct CannedServer {
    addr: SocketAddr,
    state: CannedState,
}

impl CannedServer {
    pub async fn start() -> Self {
        let state = CannedState::default();
        let app = Router::new().fallback(handle_canned).with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, state }
    }

    pub fn route(&self, method: &str, path: &str, status: u16, body: &str) -> &Self {
        self.state.routes.lock().unwrap().insert(
            (Method::from_bytes(method.as_bytes()).unwrap(), path.to_string()),
            CannedResponse {
                status: StatusCode::from_u16(status).unwrap(),
                body: body.to_string(),
            },
        );
        self
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> usize {
        self.state.requests.load(SeqCst)
    }

    /// Serves an IMDSv2 session token and the given instance identity document.
    pub fn imds_identity(&self, account_id: &str) -> &Self {
        self.route("PUT", "/latest/api/token", 200, "imds-session-token").route(
            "GET",
            "/latest/dynamic/instance-identity/document",
            200,
            &format!(
                r#"{{"accountId": "{}", "instanceId": "i-0abc123", "region": "us-west-2"}}"#,
                account_id
            ),
        )
    }
}

async fn handle_canned(State(state): State<CannedState>, method: Method, uri: Uri) -> (StatusCode, String) {
    state.requests.fetch_add(1, SeqCst);

    let route = (method, uri.path().to_string());
    match state.routes.lock().unwrap().get(&route) {
        Some(response) => (response.status, response.body.clone()),
        None => (StatusCode::NOT_FOUND, "not found".to_string()),
    }
}

/// Writes an identity agent configuration to a temporary file.
pub fn sia_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

/// Builds a configuration from static values.
pub fn configuration(values: serde_json::Value) -> GenericConfiguration {
    ConfigurationLoader::default().from_values(values).unwrap().into_generic()
}
