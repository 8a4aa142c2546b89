use crate::ipc::error::{err, fail, ok};
use crate::ipc::types::{AppState, Request};
use crate::model::Settings;
use crate::settings;
use crate::store::StoreError;
use serde_json::json;

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return fail(&req.id, StoreError::StoreUnavailable.into());
    };
    match settings::get(conn) {
        Ok(s) => ok(&req.id, json!({ "settings": s })),
        Err(e) => fail(&req.id, e),
    }
}

fn handle_set(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return fail(&req.id, StoreError::StoreUnavailable.into());
    };
    let Some(raw) = req.params.get("settings") else {
        return err(&req.id, "bad_params", "missing params.settings", None);
    };
    let incoming: Settings = match serde_json::from_value(raw.clone()) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "bad_params", format!("invalid settings: {e}"), None),
    };
    match settings::set(conn, &incoming) {
        Ok(()) => ok(&req.id, json!({})),
        Err(e) => fail(&req.id, e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "settings.get" => Some(handle_get(state, req)),
        "settings.set" => Some(handle_set(state, req)),
        _ => None,
    }
}
