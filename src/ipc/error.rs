use serde_json::json;

use crate::store::StoreError;

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

/// Map a repository failure to its wire code. Typed store errors keep their
/// identity across the boundary; everything else is a generic store error.
pub fn fail(id: &str, e: anyhow::Error) -> serde_json::Value {
    let code = match e.downcast_ref::<StoreError>() {
        Some(StoreError::NotFound(_)) => "not_found",
        Some(StoreError::InvalidInput(_)) => "invalid_input",
        Some(StoreError::ImportFailed(_)) => "import_failed",
        Some(StoreError::StoreUnavailable) => "store_unavailable",
        None => "store_error",
    };
    err(id, code, format!("{e:#}"), None)
}
