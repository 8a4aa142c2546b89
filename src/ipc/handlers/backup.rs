use crate::backup;
use crate::ipc::error::{err, fail, ok};
use crate::ipc::types::{AppState, Request};
use crate::store::StoreError;
use serde_json::json;
use std::path::PathBuf;

fn handle_export_all(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return fail(&req.id, StoreError::StoreUnavailable.into());
    };
    match backup::export_all(conn) {
        Ok(document) => ok(&req.id, json!({ "document": document })),
        Err(e) => fail(&req.id, e),
    }
}

fn handle_export_project(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return fail(&req.id, StoreError::StoreUnavailable.into());
    };
    let Some(project_id) = req.params.get("projectId").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.projectId", None);
    };
    match backup::export_one(conn, project_id) {
        Ok(document) => ok(&req.id, json!({ "document": document })),
        Err(e) => fail(&req.id, e),
    }
}

fn handle_export_archive(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return fail(&req.id, StoreError::StoreUnavailable.into());
    };
    let Some(out_path) = req
        .params
        .get("outPath")
        .and_then(|v| v.as_str())
        .map(PathBuf::from)
    else {
        return err(&req.id, "bad_params", "missing params.outPath", None);
    };
    match backup::export_archive(conn, &out_path) {
        Ok(summary) => ok(
            &req.id,
            json!({
                "path": out_path.to_string_lossy(),
                "entryCount": summary.entry_count,
            }),
        ),
        Err(e) => fail(&req.id, e),
    }
}

fn handle_import_all(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return fail(&req.id, StoreError::StoreUnavailable.into());
    };
    let Some(document) = req.params.get("document") else {
        return err(&req.id, "bad_params", "missing params.document", None);
    };
    let merge = req
        .params
        .get("merge")
        .and_then(|v| v.as_bool())
        .unwrap_or(false);

    match backup::import_all(conn, document, merge) {
        Ok(summary) => ok(
            &req.id,
            json!({
                "inserted": summary.inserted,
                "skipped": summary.skipped,
                "settingsApplied": summary.settings_applied,
            }),
        ),
        Err(e) => fail(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.exportAll" => Some(handle_export_all(state, req)),
        "backup.exportProject" => Some(handle_export_project(state, req)),
        "backup.exportArchive" => Some(handle_export_archive(state, req)),
        "backup.importAll" => Some(handle_import_all(state, req)),
        _ => None,
    }
}
