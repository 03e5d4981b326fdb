//! Lamport logical clock.
//!
//! Two rules keep the clock consistent with causality:
//!  - Local send event: `clock := clock + 1`, then stamp the message
//!  - Receipt of timestamp `t`: `clock := max(clock, t) + 1`
//!
//! The clock never decreases, and after observing `t` it is strictly
//! greater than `t` for every `t <= MAX_TIMESTAMP`. Decoded messages never
//! carry a larger timestamp, so the clock would need 2^63 local events to
//! reach the point where it saturates.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest timestamp accepted from the wire.
pub const MAX_TIMESTAMP: u64 = u64::MAX / 2;

/// A scalar Lamport clock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LamportClock(u64);

impl LamportClock {
    /// Create a clock at zero.
    pub fn new() -> Self {
        Self(0)
    }

    /// Create a clock starting at `value`.
    pub fn starting_at(value: u64) -> Self {
        Self(value)
    }

    /// Current value.
    pub fn now(&self) -> u64 {
        self.0
    }

    /// Advance for a local event and return the timestamp to send.
    pub fn tick(&mut self) -> u64 {
        self.0 = self.0.saturating_add(1);
        self.0
    }

    /// Merge a received timestamp and return the new value.
    pub fn observe(&mut self, remote: u64) -> u64 {
        self.0 = self.0.max(remote).saturating_add(1);
        self.0
    }
}

impl fmt::Display for LamportClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
