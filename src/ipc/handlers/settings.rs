use crate::config::{self, ImportConfig};
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_config_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(importer) = state.importer.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    ok(&req.id, json!({ "config": importer.config() }))
}

fn handle_config_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (Some(conn), Some(importer)) = (state.db.as_ref(), state.importer.as_mut()) else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(raw) = req.params.get("config") else {
        return err(&req.id, "bad_params", "missing config", None);
    };
    let cfg: ImportConfig = match serde_json::from_value(raw.clone()) {
        Ok(c) => c,
        Err(e) => return err(&req.id, "bad_params", format!("invalid config: {e}"), None),
    };
    if cfg.group_anchors.iter().all(|a| a.trim().is_empty())
        || cfg.subject_anchors.iter().all(|a| a.trim().is_empty())
    {
        return err(
            &req.id,
            "bad_params",
            "groupAnchors and subjectAnchors need at least one non-empty entry",
            None,
        );
    }

    if let Err(e) = config::save_import_config(conn, &cfg) {
        return err(&req.id, "db_update_failed", format!("{e:#}"), None);
    }
    if let Err(e) = db::set_busy_timeout(conn, cfg.busy_timeout_ms) {
        return err(&req.id, "db_update_failed", format!("{e:#}"), None);
    }
    importer.set_config(cfg.clone());
    ok(&req.id, json!({ "config": cfg }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "import.config.get" => Some(handle_config_get(state, req)),
        "import.config.set" => Some(handle_config_set(state, req)),
        _ => None,
    }
}
