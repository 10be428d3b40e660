//! Window-facing IPC surface — the loopback HTTP endpoints the desktop
//! front-end calls with field values and click events.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use crate::shell::{FormFields, Shell};

/// IPC server state shared by all `/api/*` handlers.
#[derive(Clone)]
pub struct IpcServer {
    pub shell: Arc<Shell>,
    pub listen_addr: String,
}

impl IpcServer {
    pub fn new(shell: Arc<Shell>, listen_addr: &str) -> Self {
        Self {
            shell,
            listen_addr: listen_addr.to_string(),
        }
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/settings", get(get_settings))
            .route("/api/export", post(export_handler))
            .route("/api/stop", post(stop_handler))
            .route("/api/status", get(status_handler))
            .route("/api/console", get(console_handler))
            .with_state(self.clone())
    }

    /// Bind and serve for the process lifetime. A port conflict here is a
    /// fatal startup condition.
    pub async fn start(self) -> Result<()> {
        let router = self.router();
        let listener = tokio::net::TcpListener::bind(&self.listen_addr)
            .await
            .with_context(|| format!("Failed to bind IPC server on {}", self.listen_addr))?;
        tracing::info!("IPC listening on http://{}", self.listen_addr);

        axum::serve(listener, router).await?;
        Ok(())
    }
}

/// GET /api/settings — the persisted form state, if any.
async fn get_settings(State(state): State<IpcServer>) -> impl IntoResponse {
    Json(json!({ "settings": state.shell.load_form() }))
}

/// POST /api/export — the export click: persist the form, then kick the
/// worker.
async fn export_handler(
    State(state): State<IpcServer>,
    Json(fields): Json<FormFields>,
) -> impl IntoResponse {
    match state.shell.export(fields).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// POST /api/stop — the stop click.
async fn stop_handler(State(state): State<IpcServer>) -> impl IntoResponse {
    match state.shell.stop().await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => e.into_response(),
    }
}

/// GET /api/status — worker liveness for the window.
async fn status_handler(State(state): State<IpcServer>) -> impl IntoResponse {
    let (running, pid) = state.shell.status().await;
    Json(json!({ "running": running, "pid": pid }))
}

/// GET /api/console?since=<id> — incremental console lines for the view.
/// The view appends what it gets and asks again from `next_id`.
async fn console_handler(
    State(state): State<IpcServer>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let since = params
        .get("since")
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);
    let lines = state.shell.console().get_since(since);
    let next_id = lines.last().map(|l| l.id).unwrap_or(since);
    Json(json!({ "lines": lines, "next_id": next_id }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use crate::channel::ChannelRole;
    use crate::console::ConsoleLog;
    use crate::settings::{SettingsStore, SettingsDocument};
    use crate::supervisor::WorkerSupervisor;
    use tokio::sync::RwLock;

    fn test_server(dir: &std::path::Path, initial: Option<SettingsDocument>) -> IpcServer {
        let store = SettingsStore::new(dir.join("settings.json"));
        let console = Arc::new(ConsoleLog::new());
        let supervisor = Arc::new(RwLock::new(WorkerSupervisor::new(dir)));
        let shell = Arc::new(Shell::new(
            ChannelRole::Host,
            store,
            console,
            supervisor,
            None,
            initial,
        ));
        IpcServer::new(shell, "127.0.0.1:0")
    }

    async fn response_json(res: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_settings_endpoint_reports_absent_document_as_null() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path(), None);

        let res = server
            .router()
            .oneshot(Request::builder().uri("/api/settings").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = response_json(res).await;
        assert!(body["settings"].is_null());
    }

    #[tokio::test]
    async fn test_settings_endpoint_returns_startup_document() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path(), Some(SettingsDocument::default()));

        let res = server
            .router()
            .oneshot(Request::builder().uri("/api/settings").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = response_json(res).await;
        assert_eq!(body["settings"]["lang"], "en");
        assert_eq!(body["settings"]["page"], 1);
    }

    #[tokio::test]
    async fn test_status_endpoint_reports_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path(), None);

        let res = server
            .router()
            .oneshot(Request::builder().uri("/api/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = response_json(res).await;
        assert_eq!(body["running"], false);
        assert!(body["pid"].is_null());
    }

    #[tokio::test]
    async fn test_console_endpoint_pages_with_since_cursor() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path(), None);
        server.shell.console().append("Start");
        server.shell.console().append("Done");

        let res = server
            .router()
            .oneshot(
                Request::builder()
                    .uri("/api/console?since=1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = response_json(res).await;
        assert_eq!(body["lines"].as_array().unwrap().len(), 1);
        assert_eq!(body["lines"][0]["content"], "Done");
        assert_eq!(body["next_id"], 2);
    }

    #[tokio::test]
    async fn test_console_endpoint_keeps_cursor_when_idle() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path(), None);

        let res = server
            .router()
            .oneshot(
                Request::builder()
                    .uri("/api/console?since=7")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = response_json(res).await;
        assert!(body["lines"].as_array().unwrap().is_empty());
        assert_eq!(body["next_id"], 7);
    }

    #[tokio::test]
    async fn test_stop_click_acks_when_nothing_runs() {
        let dir = tempfile::tempdir().unwrap();
        let server = test_server(dir.path(), None);

        let res = server
            .router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/stop")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = response_json(res).await;
        assert_eq!(body["success"], true);
    }
}
