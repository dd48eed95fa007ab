use anyhow::Context;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::db;

pub const IMPORT_CONFIG_KEY: &str = "import.config";

/// Labels and anchors used to read a flattened rating report.
///
/// Stored per workspace under [`IMPORT_CONFIG_KEY`]. Every field falls back to
/// the layout the desktop exporter writes, so a partial JSON object is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportConfig {
    pub group_anchors: Vec<String>,
    pub subject_anchors: Vec<String>,
    pub header_labels: Vec<String>,
    pub summary_markers: Vec<String>,
    pub busy_timeout_ms: u64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            group_anchors: vec!["Группа:".into(), "отчёт по группе".into()],
            subject_anchors: vec!["Дисциплина:".into()],
            header_labels: vec![
                "ФИО".into(),
                "ФИО студента".into(),
                "Рейтинг".into(),
                "Дисциплина".into(),
                "№ п/п".into(),
            ],
            summary_markers: vec!["Сводка рейтингов по группе".into()],
            busy_timeout_ms: 5000,
        }
    }
}

impl ImportConfig {
    pub fn is_header_label(&self, name: &str) -> bool {
        let name = name.trim().to_lowercase();
        self.header_labels
            .iter()
            .any(|label| label.trim().to_lowercase() == name)
    }
}

/// Loads the workspace import config, falling back to defaults when the stored
/// value is missing or no longer deserializes.
pub fn load_import_config(conn: &Connection) -> anyhow::Result<ImportConfig> {
    let Some(raw) = db::settings_get_json(conn, IMPORT_CONFIG_KEY)? else {
        return Ok(ImportConfig::default());
    };
    match serde_json::from_value::<ImportConfig>(raw) {
        Ok(cfg) => Ok(cfg),
        Err(e) => {
            warn!(error = %e, "stored import config is unreadable; using defaults");
            Ok(ImportConfig::default())
        }
    }
}

pub fn save_import_config(conn: &Connection, cfg: &ImportConfig) -> anyhow::Result<()> {
    let value = serde_json::to_value(cfg).context("failed to serialize import config")?;
    db::settings_set_json(conn, IMPORT_CONFIG_KEY, &value)
}
