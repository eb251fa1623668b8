//! Stub donor service for HTTP-level tests.

use axum::{
    Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use eyre::WrapErr;
use gtd_donor_bridge::config::DonorConfig;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Header the donor service reads the credential from.
pub const API_KEY: &str = "x-api-key";

/// Canned answer served by the stub.
#[derive(Debug, Clone)]
pub struct Canned {
    status: StatusCode,
    body: String,
    delay: Option<Duration>,
}

impl Canned {
    /// A `200 OK` JSON answer.
    #[must_use]
    pub fn json(value: &Value) -> Self {
        Self::raw(StatusCode::OK, &value.to_string())
    }

    /// An answer with `status` and an empty JSON object body.
    #[must_use]
    pub fn status(status: StatusCode) -> Self {
        Self::raw(status, "{}")
    }

    /// An answer with an arbitrary body.
    #[must_use]
    pub fn raw(status: StatusCode, body: &str) -> Self {
        Self {
            status,
            body: body.to_owned(),
            delay: None,
        }
    }

    /// Holds the answer back for `delay`.
    #[must_use]
    pub const fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    async fn respond(self) -> Response {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (
            self.status,
            [(header::CONTENT_TYPE, "application/json")],
            self.body,
        )
            .into_response()
    }
}

/// A request observed by the stub.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeenRequest {
    /// Decoded task identifier for detail requests.
    pub task_id: Option<String>,
    /// Credential header, if sent.
    pub api_key: Option<String>,
    /// `limit` query parameter, if sent.
    pub limit: Option<String>,
}

#[derive(Debug, Default)]
struct StubState {
    list: Mutex<Option<Canned>>,
    details: Mutex<HashMap<String, Canned>>,
    seen: Mutex<Vec<SeenRequest>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn api_key(headers: &HeaderMap) -> Option<String> {
    headers
        .get(API_KEY)
        .and_then(|value| value.to_str().ok())
        .map(ToOwned::to_owned)
}

async fn list_tasks(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    lock(&state.seen).push(SeenRequest {
        task_id: None,
        api_key: api_key(&headers),
        limit: query.get("limit").cloned(),
    });
    let canned = lock(&state.list)
        .clone()
        .unwrap_or_else(|| Canned::json(&json!([])));
    canned.respond().await
}

async fn get_task(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    Path(task_id): Path<String>,
) -> Response {
    lock(&state.seen).push(SeenRequest {
        task_id: Some(task_id.clone()),
        api_key: api_key(&headers),
        limit: None,
    });
    let canned = lock(&state.details)
        .get(&task_id)
        .cloned()
        .unwrap_or_else(|| Canned::status(StatusCode::NOT_FOUND));
    canned.respond().await
}

/// A donor service stub listening on a local port.
///
/// The server stops when the stub is dropped.
#[derive(Debug)]
pub struct StubDonor {
    addr: SocketAddr,
    state: Arc<StubState>,
    server: JoinHandle<()>,
}

impl Drop for StubDonor {
    fn drop(&mut self) {
        self.server.abort();
    }
}

impl StubDonor {
    /// Starts a stub serving an empty task list.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start() -> eyre::Result<Self> {
        let state = Arc::new(StubState::default());
        let app = Router::new()
            .route("/api/v1/tasks", get(list_tasks))
            .route("/api/v1/tasks/{id}", get(get_task))
            .with_state(Arc::clone(&state));
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .wrap_err("bind stub listener")?;
        let addr = listener.local_addr().wrap_err("read stub address")?;
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });
        Ok(Self {
            addr,
            state,
            server,
        })
    }

    /// Returns the stub's base URL.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Returns a configuration pointing at the stub.
    ///
    /// # Errors
    ///
    /// Returns an error if the stub URL is rejected.
    pub fn config(&self) -> eyre::Result<DonorConfig> {
        DonorConfig::new(&self.base_url()).wrap_err("stub URL should be valid")
    }

    /// Sets the answer for the list endpoint.
    pub fn serve_list(&self, canned: Canned) {
        *lock(&self.state.list) = Some(canned);
    }

    /// Sets the answer for one task's detail endpoint.
    pub fn serve_detail(&self, task_id: &str, canned: Canned) {
        lock(&self.state.details).insert(task_id.to_owned(), canned);
    }

    /// Returns every request observed so far.
    #[must_use]
    pub fn requests(&self) -> Vec<SeenRequest> {
        lock(&self.state.seen).clone()
    }

    /// Returns how many list requests were observed.
    #[must_use]
    pub fn list_hits(&self) -> usize {
        lock(&self.state.seen)
            .iter()
            .filter(|request| request.task_id.is_none())
            .count()
    }
}

/// Returns a URL on a local port that nothing listens on.
///
/// # Errors
///
/// Returns an error if a probe listener cannot be bound.
pub async fn closed_port_url() -> eyre::Result<String> {
    let probe = TcpListener::bind("127.0.0.1:0")
        .await
        .wrap_err("bind probe listener")?;
    let addr = probe.local_addr().wrap_err("read probe address")?;
    drop(probe);
    Ok(format!("http://{addr}"))
}

/// Three donor tasks in the donor service's native shape.
#[must_use]
pub fn sample_tasks() -> Value {
    json!([
        {"id": 1, "description": "Call donor", "status": "pending", "is_thank": false},
        {"id": 2, "description": "Gift processed", "status": "completed"},
        {"id": 3, "description": "Pledge voided", "status": "cancelled"}
    ])
}
