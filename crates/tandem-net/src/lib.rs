//! Line transport for the Tandem DME.
//!
//! The engine only needs two things from the network: a way to push one line
//! of text at its peer ([`LineSink`]) and someone to hand it incoming lines one
//! at a time ([`LineHandler`]). This crate provides those seams plus two
//! implementations:
//!
//! - [`memory`] - channel-backed links for tests and simulations
//! - [`tcp`] - newline-framed TCP with connect-retry and an accept loop

pub mod codec;
pub mod error;
pub mod link;
pub mod memory;
pub mod tcp;

pub use codec::PeerLineCodec;
pub use error::{NetError, Result};
pub use link::{strip_terminator, LineHandler, LineSink};
pub use memory::{link_pair, pump, ChannelSink, LinkEnd, RecordingSink};
pub use tcp::{
    bind, connect_with_retry, serve, spawn_reconnecting_writer, spawn_writer, RetryPolicy,
    MAX_LINE_LENGTH,
};
