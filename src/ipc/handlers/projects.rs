use crate::ipc::error::{err, fail, ok};
use crate::ipc::types::{AppState, Request};
use crate::model::{Grid, Objective, Project, Student};
use crate::projects;
use crate::store::StoreError;
use serde_json::json;

fn handle_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return fail(&req.id, StoreError::StoreUnavailable.into());
    };
    let Some(name) = req.params.get("name").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.name", None);
    };
    let description = req
        .params
        .get("description")
        .and_then(|v| v.as_str())
        .unwrap_or("");

    match projects::create(conn, name, description) {
        Ok(project) => ok(&req.id, json!({ "project": project })),
        Err(e) => fail(&req.id, e),
    }
}

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return fail(&req.id, StoreError::StoreUnavailable.into());
    };
    match projects::list(conn) {
        Ok(list) => ok(&req.id, json!({ "projects": list })),
        Err(e) => fail(&req.id, e),
    }
}

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return fail(&req.id, StoreError::StoreUnavailable.into());
    };
    let Some(project_id) = req.params.get("projectId").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.projectId", None);
    };
    match projects::get(conn, project_id) {
        Ok(project) => ok(&req.id, json!({ "project": project })),
        Err(e) => fail(&req.id, e),
    }
}

fn handle_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return fail(&req.id, StoreError::StoreUnavailable.into());
    };
    let Some(raw) = req.params.get("project") else {
        return err(&req.id, "bad_params", "missing params.project", None);
    };
    let project: Project = match serde_json::from_value(raw.clone()) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", format!("invalid project: {e}"), None),
    };
    match projects::update(conn, &project) {
        Ok(updated_at) => ok(&req.id, json!({ "updatedAt": updated_at })),
        Err(e) => fail(&req.id, e),
    }
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return fail(&req.id, StoreError::StoreUnavailable.into());
    };
    let Some(project_id) = req.params.get("projectId").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.projectId", None);
    };
    match projects::delete(conn, project_id) {
        Ok(()) => ok(&req.id, json!({ "deleted": true })),
        Err(e) => fail(&req.id, e),
    }
}

fn handle_duplicate(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return fail(&req.id, StoreError::StoreUnavailable.into());
    };
    let Some(project_id) = req.params.get("projectId").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.projectId", None);
    };
    match projects::duplicate(conn, project_id) {
        Ok(project) => ok(&req.id, json!({ "project": project })),
        Err(e) => fail(&req.id, e),
    }
}

fn handle_derive_evaluation(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return fail(&req.id, StoreError::StoreUnavailable.into());
    };
    let Some(project_id) = req.params.get("projectId").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.projectId", None);
    };
    match projects::derive_evaluation(conn, project_id) {
        Ok(project) => ok(&req.id, json!({ "project": project })),
        Err(e) => fail(&req.id, e),
    }
}

fn handle_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return fail(&req.id, StoreError::StoreUnavailable.into());
    };
    let Some(project_id) = req.params.get("projectId").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.projectId", None);
    };
    let user = req
        .params
        .get("user")
        .and_then(|v| v.as_str())
        .unwrap_or("local");
    match projects::record_opened(conn, user, project_id) {
        Ok(recorded) => ok(&req.id, json!({ "recorded": recorded })),
        Err(e) => fail(&req.id, e),
    }
}

/// Commit of the UI's in-memory working copy. The project id may be absent
/// (no project open yet); that is a logged no-op, not an error.
fn handle_flush(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return fail(&req.id, StoreError::StoreUnavailable.into());
    };
    let project_id = req.params.get("projectId").and_then(|v| v.as_str());

    let students: Vec<Student> = match req.params.get("students") {
        None => Vec::new(),
        Some(raw) => match serde_json::from_value(raw.clone()) {
            Ok(v) => v,
            Err(e) => return err(&req.id, "bad_params", format!("invalid students: {e}"), None),
        },
    };
    let objectives: Vec<Objective> = match req.params.get("objectives") {
        None => Vec::new(),
        Some(raw) => match serde_json::from_value(raw.clone()) {
            Ok(v) => v,
            Err(e) => return err(&req.id, "bad_params", format!("invalid objectives: {e}"), None),
        },
    };
    let grids: Vec<Grid> = match req.params.get("grids") {
        None => Vec::new(),
        Some(raw) => match serde_json::from_value(raw.clone()) {
            Ok(v) => v,
            Err(e) => return err(&req.id, "bad_params", format!("invalid grids: {e}"), None),
        },
    };

    match projects::flush_working(conn, project_id, &students, &objectives, &grids) {
        Ok(outcome) => ok(&req.id, json!({ "applied": outcome.applied() })),
        Err(e) => fail(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "projects.create" => Some(handle_create(state, req)),
        "projects.list" => Some(handle_list(state, req)),
        "projects.get" => Some(handle_get(state, req)),
        "projects.update" => Some(handle_update(state, req)),
        "projects.delete" => Some(handle_delete(state, req)),
        "projects.duplicate" => Some(handle_duplicate(state, req)),
        "projects.deriveEvaluation" => Some(handle_derive_evaluation(state, req)),
        "projects.open" => Some(handle_open(state, req)),
        "projects.flush" => Some(handle_flush(state, req)),
        _ => None,
    }
}
