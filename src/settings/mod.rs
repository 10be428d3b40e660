//! Settings store — the export form's persisted state (`settings.json`).
//!
//! The document is read once at startup if present and overwritten wholesale
//! on every export. There is no schema versioning and no partial update.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Fixed path of the settings document, relative to the core's working
/// directory.
pub const SETTINGS_JSON_PATH: &str = "settings.json";

/// The full settings form. Key order in the file follows field order here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsDocument {
    pub zkb_url: String,
    pub lang: String,
    pub filepath: String,
    pub format: String,
    pub page: u32,
    pub limit: u32,
    #[serde(rename = "clear-cache")]
    pub clear_cache: bool,
    #[serde(rename = "update-sde")]
    pub update_sde: bool,
}

impl Default for SettingsDocument {
    fn default() -> Self {
        Self {
            zkb_url: String::new(),
            lang: "en".to_string(),
            filepath: "export/export".to_string(),
            format: "excel".to_string(),
            page: 1,
            limit: 1,
            clear_cache: false,
            update_sde: false,
        }
    }
}

/// Coerce a raw numeric form field to its stored value. Non-numeric input
/// and zero both fall back to 1.
pub fn coerce_count(raw: &str) -> u32 {
    match raw.trim().parse::<u32>() {
        Ok(0) | Err(_) => 1,
        Ok(n) => n,
    }
}

/// Reads and writes the settings document at a fixed path.
pub struct SettingsStore {
    file_path: PathBuf,
}

impl SettingsStore {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }

    /// Read the document if the file exists. A missing file is a normal
    /// first run, not an error; a malformed one is.
    pub fn load(&self) -> Result<Option<SettingsDocument>> {
        if !self.file_path.exists() {
            tracing::info!(
                "No settings file at {}, the form keeps its defaults",
                self.file_path.display()
            );
            return Ok(None);
        }

        let content = fs::read_to_string(&self.file_path)
            .with_context(|| format!("Failed to read {}", self.file_path.display()))?;
        let doc = serde_json::from_str(&content)
            .with_context(|| format!("Malformed settings file {}", self.file_path.display()))?;
        Ok(Some(doc))
    }

    /// Overwrite the file with the full document, pretty-printed with
    /// 4-space indentation.
    pub fn save(&self, doc: &SettingsDocument) -> Result<()> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        doc.serialize(&mut ser)
            .context("Failed to serialize settings document")?;

        fs::write(&self.file_path, buf)
            .with_context(|| format!("Failed to write {}", self.file_path.display()))?;
        tracing::info!("Saved settings to {}", self.file_path.display());
        Ok(())
    }
}
