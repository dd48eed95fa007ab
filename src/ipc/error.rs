use serde_json::json;

use crate::error::ImportError;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

pub fn import_error_details(e: &ImportError) -> Option<serde_json::Value> {
    match e {
        ImportError::MissingField(field) => Some(json!({ "field": field.as_str() })),
        _ => None,
    }
}

pub fn import_err(id: &str, e: &ImportError) -> serde_json::Value {
    err(id, e.code(), e.to_string(), import_error_details(e))
}
