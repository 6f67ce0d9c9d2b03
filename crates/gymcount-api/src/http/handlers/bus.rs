//! GET /api/bus - state and counters of the MQTT connector.

use axum::Json;
use axum::extract::State;
use gymcount_core::bus::StatsSnapshot;
use gymcount_types::bus::ConnectorState;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct BusStatusResponse {
    pub state: ConnectorState,
    #[serde(flatten)]
    pub stats: StatsSnapshot,
}

pub async fn get_bus_status(State(state): State<AppState>) -> Json<BusStatusResponse> {
    Json(BusStatusResponse {
        state: state.bus.state(),
        stats: state.bus.stats(),
    })
}
