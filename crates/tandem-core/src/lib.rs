//! Tandem core types.
//!
//! Everything in this crate is plain data: no locks, no I/O. The engine in
//! `tandem-dme` owns instances of these types behind its own mutex.
//!
//! - [`node`] - node identity
//! - [`clock`] - Lamport logical clock
//! - [`stamp`] - `(timestamp, node)` request records and their priority order
//! - [`message`] - REQUEST / REPLY / RELEASE line codec

pub mod clock;
pub mod message;
pub mod node;
pub mod stamp;

pub use clock::{LamportClock, MAX_TIMESTAMP};
pub use message::{Message, ParseError};
pub use node::NodeId;
pub use stamp::RequestStamp;
