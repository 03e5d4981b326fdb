//! Error types for the transport layer.

use std::io;
use thiserror::Error;

/// Errors raised while setting up links. Once a link is up, send failures are
/// logged and dropped rather than returned.
#[derive(Error, Debug)]
pub enum NetError {
    #[error("Invalid address {addr}: {source}")]
    InvalidAddress {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to connect to {addr} after {attempts} attempts: {source}")]
    Connect {
        addr: String,
        attempts: u32,
        #[source]
        source: io::Error,
    },
}

pub type Result<T> = std::result::Result<T, NetError>;
