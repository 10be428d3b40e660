//! Core configuration — `config/core.toml`, operator tuning knobs.
//!
//! Unlike `settings.json` (whose parse errors are fatal), this file is
//! optional convenience: missing or malformed falls back to defaults.

use std::path::PathBuf;

use serde::Deserialize;

use crate::channel::{ChannelRole, CHANNEL_HOST, CHANNEL_PORT};

/// Default listen address for the window-facing IPC surface.
pub const DEFAULT_IPC_LISTEN: &str = "127.0.0.1:57575";

const CONFIG_PATH: &str = "config/core.toml";

#[derive(Deserialize, Debug, Clone, Default)]
pub struct CoreConfig {
    /// Which side of the control channel this core plays. Default: host.
    pub channel_role: Option<ChannelRole>,
    /// Channel port override; both sides must agree on it.
    pub channel_port: Option<u16>,
    /// Window-facing IPC listen address override.
    pub ipc_listen: Option<String>,
    /// Application root override, used for worker resolution and handed to
    /// the worker as its positional argument. Default: current directory.
    pub app_root: Option<String>,
}

impl CoreConfig {
    pub fn load() -> Self {
        let s = std::fs::read_to_string(CONFIG_PATH).unwrap_or_default();
        match toml::from_str(&s) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!("Ignoring malformed {}: {}", CONFIG_PATH, e);
                Self::default()
            }
        }
    }

    pub fn channel_role(&self) -> ChannelRole {
        self.channel_role.unwrap_or_default()
    }

    pub fn channel_port(&self) -> u16 {
        self.channel_port.unwrap_or(CHANNEL_PORT)
    }

    pub fn channel_addr(&self) -> String {
        format!("{}:{}", CHANNEL_HOST, self.channel_port())
    }

    pub fn ipc_listen(&self) -> String {
        self.ipc_listen
            .clone()
            .unwrap_or_else(|| DEFAULT_IPC_LISTEN.to_string())
    }

    pub fn app_root(&self) -> PathBuf {
        match &self.app_root {
            Some(p) => PathBuf::from(p),
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_yields_defaults() {
        let cfg: CoreConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.channel_role(), ChannelRole::Host);
        assert_eq!(cfg.channel_port(), CHANNEL_PORT);
        assert_eq!(cfg.ipc_listen(), DEFAULT_IPC_LISTEN);
    }

    #[test]
    fn test_dial_role_and_port_override() {
        let cfg: CoreConfig = toml::from_str(
            r#"
            channel_role = "dial"
            channel_port = 5353
            "#,
        )
        .unwrap();
        assert_eq!(cfg.channel_role(), ChannelRole::Dial);
        assert_eq!(cfg.channel_addr(), "127.0.0.1:5353");
    }

    #[test]
    fn test_app_root_override() {
        let cfg: CoreConfig = toml::from_str(r#"app_root = "/opt/zkb2excel""#).unwrap();
        assert_eq!(cfg.app_root(), PathBuf::from("/opt/zkb2excel"));
    }
}
