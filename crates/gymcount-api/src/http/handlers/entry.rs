//! Trigger gateway.
//!
//! POST /api/entry - record one entry trigger from an HTTP client.

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::http::error::AppError;
use crate::http::extractors::api_key::authorize;
use crate::state::AppState;

/// Raw message stored as latest activity for HTTP triggers.
pub const API_ENTRY_MESSAGE: &str = "entry";

/// Body of `POST /api/entry`. Both fields are optional; an empty body is
/// treated as `{}`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryRequest {
    pub source: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryResponse {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recorded_at_utc: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    pub active_last_hour: usize,
}

/// POST /api/entry
///
/// Returns 401 before touching the counter when a key is configured and the
/// presented one does not match. Debounced triggers still answer 200.
pub async fn record_entry(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<EntryResponse>, AppError> {
    let request = parse_request(&body)?;
    authorize(state.api_key.as_ref(), &headers, request.api_key.as_deref())?;

    let source = request
        .source
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or("unknown")
        .to_string();

    let outcome = state
        .counter
        .record_entry(&format!("api:{source}"), API_ENTRY_MESSAGE);

    tracing::info!(
        source = %source,
        accepted = outcome.accepted,
        active = outcome.active_count,
        "entry trigger"
    );

    let response = if outcome.accepted {
        EntryResponse {
            accepted: true,
            recorded_at_utc: Some(outcome.observed_at),
            source: Some(source),
            reason: None,
            active_last_hour: outcome.active_count,
        }
    } else {
        EntryResponse {
            accepted: false,
            recorded_at_utc: None,
            source: None,
            reason: Some("debounced"),
            active_last_hour: outcome.active_count,
        }
    };
    Ok(Json(response))
}

fn parse_request(body: &[u8]) -> Result<EntryRequest, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(EntryRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::Validation(format!("Invalid request body: {e}")))
}
