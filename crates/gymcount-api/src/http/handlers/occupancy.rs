//! Read-only counter endpoints.
//!
//! GET /api/occupancy - active count and window cutoff
//! GET /api/latest    - most recent trigger, debounced or not
//! GET /api/settings  - configured windows

use axum::Json;
use axum::extract::State;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OccupancyResponse {
    pub active_last_hour: usize,
    pub cutoff_utc: DateTime<Utc>,
    pub window_minutes: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestResponse {
    pub latest_message: Option<String>,
    pub latest_message_utc: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResponse {
    pub presence_window_secs: u64,
    pub debounce_window_secs: u64,
}

/// GET /api/occupancy
pub async fn get_occupancy(State(state): State<AppState>) -> Json<OccupancyResponse> {
    let window = state.counter.settings().presence_window;
    let now = Utc::now();
    let cutoff_utc = TimeDelta::from_std(window)
        .ok()
        .and_then(|delta| now.checked_sub_signed(delta))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);

    Json(OccupancyResponse {
        active_last_hour: state.counter.active_count(),
        cutoff_utc,
        window_minutes: window.as_secs_f64() / 60.0,
    })
}

/// GET /api/latest
pub async fn get_latest(State(state): State<AppState>) -> Json<LatestResponse> {
    let latest = state.counter.latest();
    Json(LatestResponse {
        latest_message: latest.as_ref().map(|l| l.display_message()),
        latest_message_utc: latest.map(|l| l.observed_at),
    })
}

/// GET /api/settings
pub async fn get_settings(State(state): State<AppState>) -> Json<SettingsResponse> {
    let settings = state.counter.settings();
    Json(SettingsResponse {
        presence_window_secs: settings.presence_window.as_secs(),
        debounce_window_secs: settings.debounce_window.as_secs(),
    })
}
