//! Sliding-window presence counter with debounce suppression.
//!
//! `WindowedCounter` keeps the instants of accepted triggers in a deque
//! ordered by acceptance. Pruning pops expired instants from the head on
//! every read and write, so the count is always exact at call time without a
//! background timer.
//!
//! Two locks, one per independent resource:
//! - `window` guards the accepted log and the last accepted instant. The
//!   debounce decision, the append and the prune happen in one critical
//!   section, so concurrent callers inside the debounce window can never both
//!   be accepted.
//! - `latest` guards the latest-activity record, so status reads never wait
//!   on the debounce section.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use gymcount_types::presence::{LatestActivity, PresenceSettings, RecordOutcome};

use crate::clock::{Clock, SystemClock};

#[derive(Debug, Default)]
struct WindowState {
    accepted: VecDeque<Instant>,
    last_accepted: Option<Instant>,
}

impl WindowState {
    /// Drop every instant strictly older than `now - window`.
    ///
    /// Stops at the first instant still inside the window; the deque is
    /// ordered because acceptances are serialized.
    fn prune(&mut self, now: Instant, settings: &PresenceSettings) {
        let Some(cutoff) = now.checked_sub(settings.presence_window) else {
            return;
        };
        while self.accepted.front().is_some_and(|ts| *ts < cutoff) {
            self.accepted.pop_front();
        }
    }

    fn within_debounce(&self, now: Instant, settings: &PresenceSettings) -> bool {
        self.last_accepted
            .is_some_and(|last| now.saturating_duration_since(last) < settings.debounce_window)
    }
}

/// Concurrency-safe trigger counter.
///
/// Share it as `Arc<WindowedCounter>`; every method takes `&self`.
pub struct WindowedCounter {
    settings: PresenceSettings,
    clock: Arc<dyn Clock>,
    window: Mutex<WindowState>,
    latest: Mutex<Option<LatestActivity>>,
}

impl WindowedCounter {
    /// Counter on the system clock.
    pub fn new(settings: PresenceSettings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    pub fn with_clock(settings: PresenceSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            settings,
            clock,
            window: Mutex::new(WindowState::default()),
            latest: Mutex::new(None),
        }
    }

    /// Record one raw trigger.
    ///
    /// The latest-activity record is overwritten whether or not the trigger
    /// passes debounce. The trigger is accepted when no earlier trigger was
    /// accepted within the debounce window.
    pub fn record_entry(&self, source: &str, raw_message: &str) -> RecordOutcome {
        let observed_at = self.clock.wall();

        *lock(&self.latest) = Some(LatestActivity {
            source: source.to_string(),
            message: raw_message.to_string(),
            observed_at,
        });

        let mut window = lock(&self.window);
        let now = self.clock.now();

        let accepted = if window.within_debounce(now, &self.settings) {
            false
        } else {
            window.last_accepted = Some(now);
            window.accepted.push_back(now);
            true
        };
        window.prune(now, &self.settings);

        RecordOutcome {
            accepted,
            active_count: window.accepted.len(),
            observed_at,
        }
    }

    /// Number of accepted triggers inside the presence window right now.
    pub fn active_count(&self) -> usize {
        let mut window = lock(&self.window);
        window.prune(self.clock.now(), &self.settings);
        window.accepted.len()
    }

    /// The most recent trigger, if any arrived yet.
    pub fn latest(&self) -> Option<LatestActivity> {
        lock(&self.latest).clone()
    }

    pub fn settings(&self) -> PresenceSettings {
        self.settings
    }
}

impl std::fmt::Debug for WindowedCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowedCounter")
            .field("settings", &self.settings)
            .field("active", &lock(&self.window).accepted.len())
            .finish()
    }
}

/// Both guarded values are consistent between statements, so a poisoned
/// lock is taken over instead of propagating the panic.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
