//! Engine phases and point-in-time snapshots.

use serde::{Deserialize, Serialize};
use std::fmt;
use tandem_core::{NodeId, RequestStamp};

/// The three mutually exclusive phases of one node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Not holding, not requesting.
    #[default]
    Released,
    /// An acquire is in flight, waiting for the peer's REPLY.
    Wanted,
    /// The local caller is inside the protected operation.
    Held,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Released => "released",
            Phase::Wanted => "wanted",
            Phase::Held => "held",
        };
        f.write_str(name)
    }
}

/// Engine state captured atomically under the engine lock.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub self_id: NodeId,
    pub peer_id: NodeId,
    pub clock: u64,
    pub phase: Phase,
    /// Our own outstanding request while wanted or held.
    pub request: Option<RequestStamp>,
    /// The peer request we still owe a REPLY.
    pub deferred: Option<RequestStamp>,
}
