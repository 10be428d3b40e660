//! Host role — the core binds the channel port and serves the operations
//! the worker calls back into while it runs.

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};
use serde_json::{json, Value};
use tokio::sync::RwLock;

use super::{RpcRequest, RpcResponse};
use crate::console::ConsoleLog;
use crate::supervisor::WorkerSupervisor;

/// Shared state for the worker-facing `/rpc/*` routes.
#[derive(Clone)]
pub struct ChannelHost {
    pub supervisor: Arc<RwLock<WorkerSupervisor>>,
    pub console: Arc<ConsoleLog>,
}

impl ChannelHost {
    pub fn new(supervisor: Arc<RwLock<WorkerSupervisor>>, console: Arc<ConsoleLog>) -> Self {
        Self { supervisor, console }
    }

    /// Build the `/rpc/*` router. The caller binds the listener before any
    /// worker is spawned, since the worker dials in after starting.
    pub fn router(self) -> Router {
        Router::new()
            .route("/rpc/echo", post(echo_handler))
            .route("/rpc/log", post(log_handler))
            .route("/rpc/exit", post(exit_handler))
            .with_state(self)
    }
}

/// POST /rpc/echo — identity, so a dialing worker can verify the link.
async fn echo_handler(Json(req): Json<RpcRequest>) -> Json<RpcResponse> {
    Json(RpcResponse { result: req.arg })
}

/// POST /rpc/log — append one line to the console view and acknowledge.
/// A null argument is acknowledged without appending anything.
async fn log_handler(
    State(state): State<ChannelHost>,
    Json(req): Json<RpcRequest>,
) -> Json<RpcResponse> {
    match req.arg {
        Value::Null => {}
        Value::String(text) => {
            state.console.append(text);
        }
        other => {
            state.console.append(other.to_string());
        }
    }
    Json(RpcResponse { result: json!(null) })
}

/// POST /rpc/exit — the worker finished its run; stop it and acknowledge.
async fn exit_handler(
    State(state): State<ChannelHost>,
    _req: Option<Json<RpcRequest>>,
) -> Json<RpcResponse> {
    let mut supervisor = state.supervisor.write().await;
    if let Err(e) = supervisor.stop().await {
        tracing::warn!("Worker exit request failed to stop the process: {}", e);
    }
    Json(RpcResponse { result: json!(null) })
}
