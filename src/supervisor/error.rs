//! Supervisor error types, with an HTTP status mapping so the IPC boundary
//! can answer the window with something better than 500-for-everything.

use axum::http::StatusCode;

#[derive(thiserror::Error, Debug)]
pub enum SupervisorError {
    /// A worker is already owned. Recoverable; the shell surfaces this on
    /// the console instead of failing the click.
    #[error("The script is already running.")]
    AlreadyRunning,

    #[error("Failed to spawn worker '{program}': {reason}")]
    SpawnFailed { program: String, reason: String },

    #[error("Failed to terminate worker (pid {pid}): {reason}")]
    TerminationFailed { pid: u32, reason: String },

    #[error("{0}")]
    Internal(#[from] anyhow::Error),
}

impl SupervisorError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::AlreadyRunning => StatusCode::CONFLICT,
            Self::SpawnFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::TerminationFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AlreadyRunning => "ALREADY_RUNNING",
            Self::SpawnFailed { .. } => "SPAWN_FAILED",
            Self::TerminationFailed { .. } => "TERMINATION_FAILED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "success": false,
            "error": self.to_string(),
            "error_code": self.error_code(),
        })
    }
}

impl axum::response::IntoResponse for SupervisorError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let body = axum::Json(self.to_json());
        (status, body).into_response()
    }
}
