use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::templates;
use serde_json::json;

fn handle_list(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let list: Vec<serde_json::Value> = templates::MODULE_TEMPLATES
        .iter()
        .map(|t| {
            json!({
                "moduleNumber": t.module_number,
                "name": t.name,
                "objectiveCount": t.objectives.len(),
            })
        })
        .collect();
    ok(&req.id, json!({ "templates": list }))
}

fn handle_get(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(module_number) = req.params.get("moduleNumber").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing params.moduleNumber", None);
    };
    let template = templates::find_template(module_number).map(|t| {
        json!({
            "moduleNumber": t.module_number,
            "name": t.name,
            "objectives": templates::materialize_objectives(t),
        })
    });
    ok(&req.id, json!({ "template": template }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "templates.list" => Some(handle_list(state, req)),
        "templates.get" => Some(handle_get(state, req)),
        _ => None,
    }
}
