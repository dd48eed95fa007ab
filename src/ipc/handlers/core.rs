use crate::config;
use crate::db;
use crate::import::ImportCoordinator;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;
use tracing::{info, warn};

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    let running = state.jobs.values().filter(|h| !h.is_finished()).count();
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "runningImports": running
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    let conn = match db::open_db(&path) {
        Ok(conn) => conn,
        Err(e) => return err(&req.id, "db_open_failed", format!("{e:#}"), None),
    };

    // A broken stored config must not prevent the workspace from opening.
    let cfg = config::load_import_config(&conn).unwrap_or_else(|e| {
        warn!(error = %e, "failed to load import config; using defaults");
        config::ImportConfig::default()
    });
    if let Err(e) = db::set_busy_timeout(&conn, cfg.busy_timeout_ms) {
        warn!(error = %e, "failed to set busy timeout");
    }

    info!(workspace = %path.display(), "workspace selected");
    let key = std::fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
    let locks = state.subject_locks.entry(key).or_default().clone();
    state.importer = Some(ImportCoordinator::with_locks(&path, cfg, locks));
    state.workspace = Some(path.clone());
    state.db = Some(conn);
    ok(&req.id, json!({ "workspacePath": path.to_string_lossy() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
