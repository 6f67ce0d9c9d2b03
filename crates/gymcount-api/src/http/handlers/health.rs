//! GET /api/health - liveness probe.

use axum::Json;
use chrono::Utc;
use serde_json::json;

pub async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "ok": true,
        "timeUtc": Utc::now(),
    }))
}
