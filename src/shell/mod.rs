//! GUI shell wiring — turns named field values and click events into
//! settings writes and worker lifecycle transitions.
//!
//! The controller owns no pixels. The window lives in the desktop front-end
//! and reaches this struct over the IPC surface; only field values and click
//! events cross that boundary.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::RwLock;

use crate::channel::dial::ChannelClient;
use crate::channel::ChannelRole;
use crate::console::ConsoleLog;
use crate::settings::{coerce_count, SettingsDocument, SettingsStore};
use crate::supervisor::error::SupervisorError;
use crate::supervisor::WorkerSupervisor;

/// Raw values of the named form fields, exactly as the window sends them.
/// `page` and `limit` arrive as free text and only become numbers through
/// the coercion rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormFields {
    #[serde(default)]
    pub zkb_url: String,
    #[serde(default)]
    pub lang: String,
    #[serde(default)]
    pub filepath: String,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub page: String,
    #[serde(default)]
    pub limit: String,
    #[serde(default, rename = "clear-cache")]
    pub clear_cache: bool,
    #[serde(default, rename = "update-sde")]
    pub update_sde: bool,
}

impl FormFields {
    /// Build the full settings document, applying the numeric defaults.
    pub fn into_document(self) -> SettingsDocument {
        SettingsDocument {
            zkb_url: self.zkb_url,
            lang: self.lang,
            filepath: self.filepath,
            format: self.format,
            page: coerce_count(&self.page),
            limit: coerce_count(&self.limit),
            clear_cache: self.clear_cache,
            update_sde: self.update_sde,
        }
    }
}

/// The event-wiring controller between the window and the bridge.
pub struct Shell {
    role: ChannelRole,
    store: SettingsStore,
    console: Arc<ConsoleLog>,
    supervisor: Arc<RwLock<WorkerSupervisor>>,
    client: Option<ChannelClient>,
    /// Settings as loaded once at startup, refreshed on every save.
    current: Mutex<Option<SettingsDocument>>,
}

impl Shell {
    pub fn new(
        role: ChannelRole,
        store: SettingsStore,
        console: Arc<ConsoleLog>,
        supervisor: Arc<RwLock<WorkerSupervisor>>,
        client: Option<ChannelClient>,
        initial: Option<SettingsDocument>,
    ) -> Self {
        Self {
            role,
            store,
            console,
            supervisor,
            client,
            current: Mutex::new(initial),
        }
    }

    pub fn console(&self) -> &ConsoleLog {
        &self.console
    }

    /// The window's initial form state; `None` keeps the form's defaults.
    pub fn load_form(&self) -> Option<SettingsDocument> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// The export click: persist the full form, then start the worker (host
    /// role) or hand the export to the already-running worker (dial role).
    pub async fn export(&self, fields: FormFields) -> Result<Value, SupervisorError> {
        let doc = fields.into_document();
        self.store.save(&doc)?;
        *self
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(doc);

        match self.role {
            ChannelRole::Host => {
                let mut supervisor = self.supervisor.write().await;
                let root_arg = supervisor.app_root().to_string_lossy().to_string();
                match supervisor.start(&[root_arg]) {
                    Ok(pid) => Ok(json!({ "success": true, "pid": pid })),
                    Err(e @ SupervisorError::AlreadyRunning) => {
                        // Surfaced to the user, not an error; the running
                        // export keeps its process.
                        self.console.append(e.to_string());
                        Ok(json!({ "success": false, "message": e.to_string() }))
                    }
                    Err(e) => Err(e),
                }
            }
            ChannelRole::Dial => {
                // Fire and forget: a failed invoke is logged, the click
                // never sees it.
                if let Some(client) = &self.client {
                    if let Err(e) = client.export_async().await {
                        tracing::warn!("Export invoke failed: {}", e);
                    }
                } else {
                    tracing::warn!("Dial role without a channel client");
                }
                Ok(json!({ "success": true }))
            }
        }
    }

    /// The stop click.
    pub async fn stop(&self) -> Result<Value, SupervisorError> {
        match self.role {
            ChannelRole::Host => {
                let mut supervisor = self.supervisor.write().await;
                supervisor.stop().await?;
                self.console.append("Stop");
                Ok(json!({ "success": true }))
            }
            ChannelRole::Dial => {
                if let Some(client) = &self.client {
                    if let Err(e) = client.terminate_async().await {
                        tracing::warn!("Terminate invoke failed: {}", e);
                    }
                }
                Ok(json!({ "success": true }))
            }
        }
    }

    /// Worker status for the window's view of the buttons.
    pub async fn status(&self) -> (bool, Option<u32>) {
        let supervisor = self.supervisor.read().await;
        (supervisor.is_running(), supervisor.pid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_fields(page: &str, limit: &str) -> FormFields {
        FormFields {
            zkb_url: "https://zkillboard.com/kills/".to_string(),
            lang: "en".to_string(),
            filepath: "export/export".to_string(),
            format: "excel".to_string(),
            page: page.to_string(),
            limit: limit.to_string(),
            clear_cache: false,
            update_sde: true,
        }
    }

    fn host_shell(dir: &std::path::Path) -> Shell {
        let store = SettingsStore::new(dir.join("settings.json"));
        let console = Arc::new(ConsoleLog::new());
        let supervisor = Arc::new(RwLock::new(WorkerSupervisor::new(dir)));
        Shell::new(ChannelRole::Host, store, console, supervisor, None, None)
    }

    #[test]
    fn test_fields_coerce_page_and_limit() {
        let doc = raw_fields("abc", "0").into_document();
        assert_eq!(doc.page, 1);
        assert_eq!(doc.limit, 1);

        let doc = raw_fields("4", "12").into_document();
        assert_eq!(doc.page, 4);
        assert_eq!(doc.limit, 12);
    }

    #[test]
    fn test_load_form_reflects_startup_document() {
        let dir = tempfile::tempdir().unwrap();
        let shell = host_shell(dir.path());
        assert!(shell.load_form().is_none());
    }

    #[tokio::test]
    async fn test_export_in_dial_role_saves_coerced_settings() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json"));
        let console = Arc::new(ConsoleLog::new());
        let supervisor = Arc::new(RwLock::new(WorkerSupervisor::new(dir.path())));
        // Nothing listens on port 1; the invoke fails and is dropped.
        let client = Some(ChannelClient::new("127.0.0.1", 1));
        let shell = Shell::new(ChannelRole::Dial, store, console, supervisor, client, None);

        let outcome = shell.export(raw_fields("abc", "3")).await.unwrap();
        assert_eq!(outcome["success"], true);

        let saved = SettingsStore::new(dir.path().join("settings.json"))
            .load()
            .unwrap()
            .expect("settings were written");
        assert_eq!(saved.page, 1);
        assert_eq!(saved.limit, 3);
        assert_eq!(shell.load_form(), Some(saved));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_export_while_running_surfaces_console_message() {
        let dir = tempfile::tempdir().unwrap();
        let shell = host_shell(dir.path());
        {
            let mut sup = shell.supervisor.write().await;
            let child = tokio::process::Command::new("sleep")
                .arg("5")
                .spawn()
                .expect("spawn sleep");
            sup.adopt(child);
        }

        let outcome = shell.export(raw_fields("2", "2")).await.unwrap();
        assert_eq!(outcome["success"], false);

        let lines = shell.console().get_since(0);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].content, "The script is already running.");

        let (running, _pid) = shell.status().await;
        assert!(running, "the first worker keeps running");

        shell.stop().await.unwrap();
        let (running, _pid) = shell.status().await;
        assert!(!running);
    }

    #[tokio::test]
    async fn test_stop_with_no_worker_still_logs_the_click() {
        let dir = tempfile::tempdir().unwrap();
        let shell = host_shell(dir.path());

        let outcome = shell.stop().await.unwrap();
        assert_eq!(outcome["success"], true);
        let lines = shell.console().get_since(0);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].content, "Stop");
    }
}
