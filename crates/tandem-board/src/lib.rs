//! Tandem Board - the shared resource the DME protects
//!
//! A tiny append-only message board kept in one text file. The server answers
//! one request per connection; clients reach it through the [`Board`] trait,
//! either over TCP ([`TcpBoard`]) or in process ([`MemoryBoard`]).
//!
//! Reads are safe without coordination. Appends from several writers are
//! expected to be bracketed by the DME critical section.

pub mod client;
pub mod error;
pub mod protocol;
pub mod server;

pub use client::{Board, MemoryBoard, TcpBoard};
pub use error::{BoardError, Result};
pub use protocol::{tail_entries, BoardRequest, BoardResponse, ErrorCode};
pub use server::BoardServer;
