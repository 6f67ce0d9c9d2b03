//! Presence counting value types shared by the counter, the bus connector
//! and the HTTP gateway.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default trailing window during which an accepted trigger stays counted.
pub const DEFAULT_PRESENCE_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Default minimum spacing between two accepted triggers.
pub const DEFAULT_DEBOUNCE_WINDOW: Duration = Duration::from_secs(3);

/// Fixed counter configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceSettings {
    /// How long an accepted trigger counts toward the active total.
    pub presence_window: Duration,
    /// Minimum time between two accepted triggers.
    pub debounce_window: Duration,
}

impl Default for PresenceSettings {
    fn default() -> Self {
        Self {
            presence_window: DEFAULT_PRESENCE_WINDOW,
            debounce_window: DEFAULT_DEBOUNCE_WINDOW,
        }
    }
}

/// Result of recording one trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordOutcome {
    /// Whether the trigger passed debounce and was added to the window.
    pub accepted: bool,
    /// Active count after pruning (including this trigger when accepted).
    pub active_count: usize,
    /// Wall-clock instant the trigger was observed.
    pub observed_at: DateTime<Utc>,
}

/// The most recently observed trigger, accepted or not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestActivity {
    /// Logical source tag (e.g. `mqtt:esp32DataChannel`, `api:front-door`).
    pub source: String,
    /// Raw payload text.
    pub message: String,
    /// Wall-clock instant the trigger was observed.
    pub observed_at: DateTime<Utc>,
}

impl LatestActivity {
    /// Display form used by the dashboard: `"{source}: {message}"`.
    pub fn display_message(&self) -> String {
        format!("{}: {}", self.source, self.message)
    }
}
