use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::store::Store;
use serde_json::json;

fn handle_groups_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match Store::new(conn).list_groups() {
        Ok(groups) => ok(&req.id, json!({ "groups": groups })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_summaries_by_group(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(group_code) = req.params.get("groupCode").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing groupCode", None);
    };

    let store = Store::new(conn);
    let group = match store.find_group_by_code(group_code) {
        Ok(Some(g)) => g,
        Ok(None) => {
            return err(
                &req.id,
                "not_found",
                "group not found",
                Some(json!({ "groupCode": group_code })),
            )
        }
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    match store.group_summaries(&group.id) {
        Ok(subjects) => ok(&req.id, json!({ "group": group, "subjects": subjects })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "groups.list" => Some(handle_groups_list(state, req)),
        "summaries.byGroup" => Some(handle_summaries_by_group(state, req)),
        _ => None,
    }
}
