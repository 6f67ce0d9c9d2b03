//! Read-only view of the connector for status queries.
//!
//! The connector owns a `StatusReporter`; everyone else holds a cloneable
//! `ConnectorHandle`. State changes travel over a `tokio::sync::watch`
//! channel, counters are plain atomics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use gymcount_types::bus::ConnectorState;
use serde::Serialize;
use tokio::sync::watch;

/// Running totals kept by the connector.
#[derive(Debug, Default)]
pub struct ConnectorStats {
    connect_attempts: AtomicU64,
    backoff_waits: AtomicU64,
    messages_processed: AtomicU64,
    malformed_messages: AtomicU64,
    acks_published: AtomicU64,
    ack_failures: AtomicU64,
    last_error: Mutex<Option<String>>,
}

/// Point-in-time copy of [`ConnectorStats`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub connect_attempts: u64,
    pub backoff_waits: u64,
    pub messages_processed: u64,
    pub malformed_messages: u64,
    pub acks_published: u64,
    pub ack_failures: u64,
    pub last_error: Option<String>,
}

impl ConnectorStats {
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            connect_attempts: self.connect_attempts.load(Ordering::Relaxed),
            backoff_waits: self.backoff_waits.load(Ordering::Relaxed),
            messages_processed: self.messages_processed.load(Ordering::Relaxed),
            malformed_messages: self.malformed_messages.load(Ordering::Relaxed),
            acks_published: self.acks_published.load(Ordering::Relaxed),
            ack_failures: self.ack_failures.load(Ordering::Relaxed),
            last_error: self
                .last_error
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone(),
        }
    }

    fn set_last_error(&self, error: String) {
        *self.last_error.lock().unwrap_or_else(|e| e.into_inner()) = Some(error);
    }
}

/// Write side, owned by the connector.
#[derive(Debug)]
pub struct StatusReporter {
    state: watch::Sender<ConnectorState>,
    stats: Arc<ConnectorStats>,
}

impl StatusReporter {
    pub fn set_state(&self, state: ConnectorState) {
        self.state.send_replace(state);
    }

    pub fn connect_attempt(&self) {
        self.stats.connect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn backoff_wait(&self) {
        self.stats.backoff_waits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn message_processed(&self) {
        self.stats.messages_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn message_malformed(&self, error: String) {
        self.stats.malformed_messages.fetch_add(1, Ordering::Relaxed);
        self.stats.set_last_error(error);
    }

    pub fn ack_published(&self) {
        self.stats.acks_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn ack_failed(&self, error: String) {
        self.stats.ack_failures.fetch_add(1, Ordering::Relaxed);
        self.stats.set_last_error(error);
    }

    pub fn error(&self, error: String) {
        self.stats.set_last_error(error);
    }
}

/// Read side, cheap to clone.
#[derive(Debug, Clone)]
pub struct ConnectorHandle {
    state: watch::Receiver<ConnectorState>,
    stats: Arc<ConnectorStats>,
}

impl ConnectorHandle {
    pub fn state(&self) -> ConnectorState {
        *self.state.borrow()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Wait until the connector reports `target`.
    ///
    /// Returns `false` if the connector was dropped first.
    pub async fn wait_for(&self, target: ConnectorState) -> bool {
        let mut rx = self.state.clone();
        rx.wait_for(|state| *state == target).await.is_ok()
    }
}

/// Create a linked reporter/handle pair, starting at `Disabled`.
///
/// The state stays `Disabled` until a connector takes the reporter and runs.
pub fn status_channel() -> (StatusReporter, ConnectorHandle) {
    let (tx, rx) = watch::channel(ConnectorState::Disabled);
    let stats = Arc::new(ConnectorStats::default());
    (
        StatusReporter {
            state: tx,
            stats: Arc::clone(&stats),
        },
        ConnectorHandle { state: rx, stats },
    )
}
