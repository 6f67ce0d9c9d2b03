//! Presence counting.
//!
//! Provides `WindowedCounter`, the single source of truth for whether a
//! trigger is accepted and how many accepted triggers are currently active.

pub mod counter;

pub use counter::WindowedCounter;
