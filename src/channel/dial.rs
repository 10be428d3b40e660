//! Dial role — the worker hosts the operations; the core connects as a
//! client, verifies the link, polls for log lines, and forwards clicks.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use ureq::AgentBuilder;

use super::{ChannelError, RpcResponse, ECHO_HANDSHAKE};
use crate::console::ConsoleLog;

/// Fixed log-polling cadence. Log visibility lags real worker output by at
/// most this interval.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Per-request timeout for channel calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Synchronous channel client. Calls block the current thread; async
/// callers go through the `*_async` wrappers below.
#[derive(Debug, Clone)]
pub struct ChannelClient {
    host: String,
    port: u16,
}

impl ChannelClient {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Invoke one named operation with zero or one argument. One request,
    /// one response; no retries.
    pub fn invoke(&self, op: &str, arg: Value) -> Result<Value, ChannelError> {
        let url = format!("{}/rpc/{}", self.base_url(), op);
        tracing::debug!("Channel invoke {}", url);

        let agent = AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        let resp = agent
            .post(&url)
            .set("Content-Type", "application/json")
            .send_json(json!({ "arg": arg }));

        match resp {
            Ok(r) => {
                let parsed: RpcResponse = r.into_json().map_err(|e| {
                    ChannelError::Transport(format!("Invalid response for '{}': {}", op, e))
                })?;
                Ok(parsed.result)
            }
            Err(ureq::Error::Status(code, r)) => {
                let body = r.into_string().unwrap_or_default();
                Err(ChannelError::Remote {
                    op: op.to_string(),
                    reason: format!("status {}: {}", code, body),
                })
            }
            Err(e) => Err(ChannelError::Transport(format!("'{}' failed: {}", op, e))),
        }
    }

    /// `echo` handshake: the link is up iff the value comes back verbatim.
    pub fn handshake(&self) -> Result<(), ChannelError> {
        let echoed = self.invoke("echo", json!(ECHO_HANDSHAKE))?;
        match echoed.as_str() {
            Some(s) if s == ECHO_HANDSHAKE => Ok(()),
            _ => Err(ChannelError::HandshakeMismatch {
                sent: ECHO_HANDSHAKE.to_string(),
                got: echoed.to_string(),
            }),
        }
    }

    /// Poll one log line. `None` means the worker had nothing new, which is
    /// not an error.
    pub fn poll_log(&self) -> Result<Option<String>, ChannelError> {
        let result = self.invoke("log", Value::Null)?;
        Ok(result
            .as_str()
            .filter(|s| !s.is_empty())
            .map(str::to_string))
    }

    pub fn export(&self) -> Result<(), ChannelError> {
        self.invoke("export", Value::Null).map(|_| ())
    }

    pub fn terminate(&self) -> Result<(), ChannelError> {
        self.invoke("terminate", Value::Null).map(|_| ())
    }
}

// ── Async wrappers ─────────────────────────────────────────
// ureq calls are synchronous; running them on a tokio worker thread would
// stall the runtime, so they are pushed onto the blocking pool.

impl ChannelClient {
    pub async fn invoke_async(&self, op: &str, arg: Value) -> Result<Value, ChannelError> {
        let client = self.clone();
        let op = op.to_string();
        tokio::task::spawn_blocking(move || client.invoke(&op, arg))
            .await
            .map_err(|e| ChannelError::Transport(format!("Blocking task failed: {}", e)))?
    }

    pub async fn handshake_async(&self) -> Result<(), ChannelError> {
        let client = self.clone();
        tokio::task::spawn_blocking(move || client.handshake())
            .await
            .map_err(|e| ChannelError::Transport(format!("Blocking task failed: {}", e)))?
    }

    pub async fn poll_log_async(&self) -> Result<Option<String>, ChannelError> {
        let client = self.clone();
        tokio::task::spawn_blocking(move || client.poll_log())
            .await
            .map_err(|e| ChannelError::Transport(format!("Blocking task failed: {}", e)))?
    }

    pub async fn export_async(&self) -> Result<(), ChannelError> {
        let client = self.clone();
        tokio::task::spawn_blocking(move || client.export())
            .await
            .map_err(|e| ChannelError::Transport(format!("Blocking task failed: {}", e)))?
    }

    pub async fn terminate_async(&self) -> Result<(), ChannelError> {
        let client = self.clone();
        tokio::task::spawn_blocking(move || client.terminate())
            .await
            .map_err(|e| ChannelError::Transport(format!("Blocking task failed: {}", e)))?
    }
}

/// Run the startup handshake. A mismatch is surfaced on the console; a
/// transport failure only reaches the core's own diagnostics. Neither is
/// fatal — later calls may still succeed.
pub async fn verify_link(client: &ChannelClient, console: &ConsoleLog) {
    match client.handshake_async().await {
        Ok(()) => tracing::info!("Channel handshake ok"),
        Err(e @ ChannelError::HandshakeMismatch { .. }) => {
            console.append(e.to_string());
        }
        Err(e) => tracing::warn!("Channel handshake failed: {}", e),
    }
}

/// Drive the fixed-interval log poll for the core's lifetime. A failed poll
/// is logged to the core's own diagnostics, never the console, and the next
/// tick proceeds unchanged — no backoff, no circuit breaker.
pub fn spawn_log_poller(client: ChannelClient, console: Arc<ConsoleLog>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(POLL_INTERVAL);
        loop {
            ticker.tick().await;
            match client.poll_log_async().await {
                Ok(Some(line)) => {
                    console.append(line);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!("Log poll failed: {}", e),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_shape() {
        let client = ChannelClient::new("127.0.0.1", 4242);
        assert_eq!(client.base_url(), "http://127.0.0.1:4242");
    }

    #[test]
    fn test_invoke_against_closed_port_is_a_transport_error() {
        // Port 1 is never serving on loopback in any sane environment.
        let client = ChannelClient::new("127.0.0.1", 1);
        let err = client.invoke("echo", json!("x")).unwrap_err();
        assert!(matches!(err, ChannelError::Transport(_)));
    }

    #[test]
    fn test_client_debug_does_not_panic() {
        let client = ChannelClient::new("127.0.0.1", 4242);
        let debug_str = format!("{:?}", client);
        assert!(debug_str.contains("ChannelClient"));
    }
}
