use crate::error::ImportError;
use crate::import::ImportReport;
use crate::ipc::error::{err, import_error_details, ok};
use crate::ipc::handlers::ratings::source_from_params;
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

fn handle_import_start(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(importer) = state.importer.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let source = match source_from_params(req) {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let job_id = Uuid::new_v4().to_string();
    let handle = importer.spawn(source);
    info!(job_id = %job_id, "background import started");
    state.jobs.insert(job_id.clone(), handle);
    ok(&req.id, json!({ "jobId": job_id }))
}

fn status_payload(result: Result<ImportReport, ImportError>) -> serde_json::Value {
    match result {
        Ok(report) => json!({ "state": "done", "report": report }),
        Err(e) => {
            let mut error = json!({ "code": e.code(), "message": e.to_string() });
            if let Some(d) = import_error_details(&e) {
                error["details"] = d;
            }
            json!({ "state": "failed", "error": error })
        }
    }
}

/// A terminal status is answered once; the job is forgotten afterwards.
fn handle_import_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(job_id) = req.params.get("jobId").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing jobId", None);
    };
    let Some(handle) = state.jobs.remove(job_id) else {
        return err(
            &req.id,
            "not_found",
            "unknown import job",
            Some(json!({ "jobId": job_id })),
        );
    };

    if !handle.is_finished() {
        state.jobs.insert(job_id.to_string(), handle);
        return ok(&req.id, json!({ "state": "running" }));
    }
    debug!(job_id, "import job collected");
    ok(&req.id, status_payload(handle.wait()))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "ratings.importStart" => Some(handle_import_start(state, req)),
        "ratings.importStatus" => Some(handle_import_status(state, req)),
        _ => None,
    }
}
