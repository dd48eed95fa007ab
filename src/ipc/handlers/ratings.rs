use crate::export::{self, ExportError, ExportLayout};
use crate::import::{ImportCoordinator, ImportSource};
use crate::ipc::error::{err, import_err, ok};
use crate::ipc::types::{AppState, Request};
use crate::store::Store;
use rusqlite::Connection;
use serde_json::json;
use std::path::PathBuf;

fn workspace<'a>(
    state: &'a AppState,
    req: &Request,
) -> Result<(&'a Connection, &'a ImportCoordinator), serde_json::Value> {
    match (state.db.as_ref(), state.importer.as_ref()) {
        (Some(conn), Some(importer)) => Ok((conn, importer)),
        _ => Err(err(&req.id, "no_workspace", "select a workspace first", None)),
    }
}

fn str_param<'a>(req: &'a Request, key: &str) -> Option<&'a str> {
    req.params.get(key).and_then(|v| v.as_str())
}

/// `text` wins over `path` when both are given.
pub(crate) fn source_from_params(req: &Request) -> Result<ImportSource, serde_json::Value> {
    if let Some(text) = str_param(req, "text") {
        return Ok(ImportSource::Text(text.to_string()));
    }
    if let Some(path) = str_param(req, "path") {
        return Ok(ImportSource::File(PathBuf::from(path)));
    }
    Err(err(&req.id, "bad_params", "missing text or path", None))
}

fn run_import(state: &mut AppState, req: &Request, source: ImportSource) -> serde_json::Value {
    let (conn, importer) = match workspace(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match importer.run_on(conn, &source) {
        Ok(report) => ok(&req.id, json!({ "report": report })),
        Err(e) => import_err(&req.id, &e),
    }
}

fn handle_import_text(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(text) = str_param(req, "text") else {
        return err(&req.id, "bad_params", "missing text", None);
    };
    let source = ImportSource::Text(text.to_string());
    run_import(state, req, source)
}

fn handle_import_file(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(path) = str_param(req, "path") else {
        return err(&req.id, "bad_params", "missing path", None);
    };
    let source = ImportSource::File(PathBuf::from(path));
    run_import(state, req, source)
}

fn handle_ratings_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (conn, _) = match workspace(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let (Some(group_code), Some(subject_code)) =
        (str_param(req, "groupCode"), str_param(req, "subjectCode"))
    else {
        return err(&req.id, "bad_params", "missing groupCode or subjectCode", None);
    };

    let store = Store::new(conn);
    let (group, subject) = match store.find_subject_by_codes(group_code, subject_code) {
        Ok(Some(v)) => v,
        Ok(None) => {
            return err(
                &req.id,
                "not_found",
                "subject not found",
                Some(json!({ "groupCode": group_code, "subjectCode": subject_code })),
            )
        }
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let ratings = match store.list_ratings(&subject.id) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let summary = match store.get_summary(&group.id, &subject.id) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    ok(
        &req.id,
        json!({
            "group": group,
            "subject": subject,
            "ratings": ratings,
            "avgScore": summary.map(|s| s.avg_score),
        }),
    )
}

fn handle_export_text(state: &mut AppState, req: &Request) -> serde_json::Value {
    let (conn, _) = match workspace(state, req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(group_code) = str_param(req, "groupCode") else {
        return err(&req.id, "bad_params", "missing groupCode", None);
    };
    let layout = match req.params.get("layout") {
        None => ExportLayout::Subject,
        Some(v) => match serde_json::from_value::<ExportLayout>(v.clone()) {
            Ok(l) => l,
            Err(_) => {
                return err(
                    &req.id,
                    "bad_params",
                    "layout must be one of: subject, full, summary",
                    Some(json!({ "layout": v })),
                )
            }
        },
    };

    let store = Store::new(conn);
    let now = chrono::Local::now().naive_local();
    let rendered = match layout {
        ExportLayout::Subject => {
            let Some(subject_code) = str_param(req, "subjectCode") else {
                return err(&req.id, "bad_params", "missing subjectCode", None);
            };
            export::export_subject_text(&store, group_code, subject_code, now)
        }
        ExportLayout::Full => export::export_full_text(&store, group_code),
        ExportLayout::Summary => export::export_summary_text(&store, group_code, now),
    };

    match rendered {
        Ok(text) => ok(&req.id, json!({ "text": text })),
        Err(e @ (ExportError::GroupNotFound(_) | ExportError::SubjectNotFound(_))) => {
            err(&req.id, "not_found", e.to_string(), None)
        }
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "ratings.importText" => Some(handle_import_text(state, req)),
        "ratings.importFile" => Some(handle_import_file(state, req)),
        "ratings.list" => Some(handle_ratings_list(state, req)),
        "ratings.exportText" => Some(handle_export_text(state, req)),
        _ => None,
    }
}
