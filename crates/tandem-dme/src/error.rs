//! Error types for the DME engine.

use crate::state::Phase;
use std::time::Duration;
use tandem_core::NodeId;
use thiserror::Error;

/// Errors surfaced to the local caller.
///
/// Malformed protocol lines are never surfaced; the engine logs and drops
/// them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DmeError {
    #[error("Peer {peer} did not reply within {waited:?}")]
    AcquireTimeout { peer: NodeId, waited: Duration },

    #[error("Acquire rejected: critical section is already {phase}")]
    Busy { phase: Phase },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DmeError {
    /// True for the recoverable "peer unresponsive" outcome; the caller may
    /// simply try again.
    pub fn is_timeout(&self) -> bool {
        matches!(self, DmeError::AcquireTimeout { .. })
    }
}

pub type Result<T> = std::result::Result<T, DmeError>;
