//! Tandem DME - Ricart–Agrawala mutual exclusion between two peers
//!
//! Each process embeds one [`Engine`]. The local caller brackets its protected
//! operation with [`Engine::acquire`] and [`Engine::release`] (or holds the
//! [`CriticalSection`] guard returned by [`Engine::enter`]); the transport's
//! receive loop feeds every line from the peer to [`Engine::handle_incoming`].
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use tandem_dme::{Engine, EngineConfigBuilder};
//! use tandem_net::{link_pair, pump};
//!
//! #[tokio::main]
//! async fn main() {
//!     let (a, b) = link_pair();
//!     let (sink_a, inbound_a) = a.split();
//!     let (sink_b, inbound_b) = b.split();
//!
//!     let alice = Arc::new(
//!         Engine::new(EngineConfigBuilder::new().self_id(1).peer_id(2).build(), sink_a).unwrap(),
//!     );
//!     let bob = Arc::new(
//!         Engine::new(EngineConfigBuilder::new().self_id(2).peer_id(1).build(), sink_b).unwrap(),
//!     );
//!     pump(inbound_a, alice.clone());
//!     pump(inbound_b, bob.clone());
//!
//!     let section = alice.enter().await.unwrap();
//!     // ... protected work ...
//!     section.exit();
//! }
//! ```
//!
//! # Modules
//!
//! - [`engine`] - the protocol state machine
//! - [`config`] - node ids and the acquire bound
//! - [`state`] - phases and snapshots
//! - [`error`] - error types
//! - [`telemetry`] - tracing subscriber setup for binaries

pub mod config;
pub mod engine;
pub mod error;
pub mod state;
pub mod telemetry;

pub use config::{EngineConfig, EngineConfigBuilder, DEFAULT_ACQUIRE_TIMEOUT_MS};
pub use engine::{CriticalSection, Engine};
pub use error::{DmeError, Result};
pub use state::{EngineSnapshot, Phase};

pub use tandem_core::{LamportClock, Message, NodeId, RequestStamp};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::{EngineConfig, EngineConfigBuilder};
    pub use crate::engine::{CriticalSection, Engine};
    pub use crate::error::DmeError;
    pub use crate::state::Phase;
    pub use tandem_core::NodeId;
}
