use crate::bootstrap;
use crate::ipc::error::ok;
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    let data_dir = bootstrap::data_dir()
        .map(|p| p.to_string_lossy().to_string())
        .ok();
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "storeReady": state.db.is_some(),
            "dataDir": data_dir,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        _ => None,
    }
}
