use axum::{extract::State, response::Json};
use serde_json::{Value, json};

use crate::infra::app_state::AppState;

pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "storage": state.storage.as_str(),
        "open_placement_sessions": state.ranking().sessions().len(),
    }))
}
