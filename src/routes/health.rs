use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn ping(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "message": format!("ping {}", state.config.ping_message) }))
}

pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}
