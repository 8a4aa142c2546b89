use crate::ipc::error::{err, fail, ok};
use crate::ipc::types::{AppState, Request};
use crate::model::Grid;
use crate::projects;
use crate::store::StoreError;
use serde_json::json;

fn handle_upsert(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return fail(&req.id, StoreError::StoreUnavailable.into());
    };
    let Some(project_id) = req.params.get("projectId").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.projectId", None);
    };
    let Some(raw) = req.params.get("grid") else {
        return err(&req.id, "bad_params", "missing params.grid", None);
    };
    let grid: Grid = match serde_json::from_value(raw.clone()) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", format!("invalid grid: {e}"), None),
    };

    match projects::upsert_grid(conn, project_id, grid) {
        Ok(outcome) => ok(&req.id, json!({ "applied": outcome.applied() })),
        Err(e) => fail(&req.id, e),
    }
}

fn handle_remove(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return fail(&req.id, StoreError::StoreUnavailable.into());
    };
    let Some(student_id) = req.params.get("studentId").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.studentId", None);
    };
    // No projectId means the global sweep across every project.
    let project_id = req.params.get("projectId").and_then(|v| v.as_str());

    match projects::remove_grid(conn, student_id, project_id) {
        Ok(removed) => ok(&req.id, json!({ "removed": removed })),
        Err(e) => fail(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grids.upsert" => Some(handle_upsert(state, req)),
        "grids.remove" => Some(handle_remove(state, req)),
        _ => None,
    }
}
