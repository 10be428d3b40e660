//! Control channel — the request/response bridge between the core and the
//! export worker over trusted loopback TCP.
//!
//! One abstraction, two roles. The host role binds the well-known port and
//! serves the operations the worker calls back into; the dial role connects
//! to a worker-hosted server, polls it for log lines, and forwards clicks.
//! Every invocation is a single `POST /rpc/<op>` carrying zero or one
//! argument, answered by a single result-or-error response. No streaming,
//! no ordering across concurrent calls, no retries, no authentication.

pub mod dial;
pub mod host;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fixed well-known channel port; both roles agree on it.
pub const CHANNEL_PORT: u16 = 4242;
/// Loopback host the channel binds to or dials.
pub const CHANNEL_HOST: &str = "127.0.0.1";
/// Handshake payload the dial role expects back verbatim from `echo`.
pub const ECHO_HANDSHAKE: &str = "server ready";

/// Which side of the control channel this core plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelRole {
    /// The core spawns the worker, binds the port, and serves `log`/`exit`
    /// for the worker to call back into.
    #[serde(rename = "host")]
    Host,
    /// The worker (spawned elsewhere) serves the operations; the core dials
    /// in, polls `log`, and forwards `export`/`terminate`.
    #[serde(rename = "dial")]
    Dial,
}

impl Default for ChannelRole {
    fn default() -> Self {
        Self::Host
    }
}

/// Channel communication error type.
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Remote operation '{op}' failed: {reason}")]
    Remote { op: String, reason: String },

    #[error("Echo handshake mismatch: sent {sent:?}, got {got}")]
    HandshakeMismatch { sent: String, got: String },
}

/// Request envelope: the operation name rides in the path, the optional
/// argument in the body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub arg: serde_json::Value,
}

/// Response envelope: a result value, or `null` for a bare acknowledgement.
/// Failures travel as an error status with an `error` body instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub result: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_default_is_host() {
        assert_eq!(ChannelRole::default(), ChannelRole::Host);
    }

    #[test]
    fn test_role_serde_names() {
        assert_eq!(serde_json::to_string(&ChannelRole::Host).unwrap(), "\"host\"");
        let role: ChannelRole = serde_json::from_str("\"dial\"").unwrap();
        assert_eq!(role, ChannelRole::Dial);
    }

    #[test]
    fn test_request_arg_defaults_to_null() {
        let req: RpcRequest = serde_json::from_str("{}").unwrap();
        assert!(req.arg.is_null());
    }

    #[test]
    fn test_response_round_trip() {
        let resp = RpcResponse {
            result: serde_json::json!("server ready"),
        };
        let text = serde_json::to_string(&resp).unwrap();
        let back: RpcResponse = serde_json::from_str(&text).unwrap();
        assert_eq!(back.result, "server ready");
    }
}
