//! Request records and Ricart–Agrawala priority.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One pending claim to the critical section: `(timestamp, node)`.
///
/// Stamps are totally ordered lexicographically, timestamp first and node id
/// second. The lower stamp has priority.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestStamp {
    pub timestamp: u64,
    pub node: NodeId,
}

impl RequestStamp {
    pub fn new(timestamp: u64, node: NodeId) -> Self {
        Self { timestamp, node }
    }

    /// True if this request must be served before `other`.
    pub fn has_priority_over(&self, other: &RequestStamp) -> bool {
        self < other
    }
}

impl fmt::Display for RequestStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(ts={}, node={})", self.timestamp, self.node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lower_timestamp_wins() {
        let a = RequestStamp::new(4, NodeId(2));
        let b = RequestStamp::new(5, NodeId(1));
        assert!(a.has_priority_over(&b));
        assert!(!b.has_priority_over(&a));
    }

    #[test]
    fn test_equal_timestamp_lower_node_wins() {
        let a = RequestStamp::new(5, NodeId(1));
        let b = RequestStamp::new(5, NodeId(2));
        assert!(a.has_priority_over(&b));
        assert!(!b.has_priority_over(&a));
    }

    #[test]
    fn test_no_priority_over_itself() {
        let a = RequestStamp::new(5, NodeId(1));
        assert!(!a.has_priority_over(&a));
    }
}
