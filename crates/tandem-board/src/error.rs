//! Error types for the board service and its clients.

use std::io;
use tandem_net::NetError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BoardError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error(transparent)]
    Net(#[from] NetError),

    #[error("Board server {addr} unreachable: {source}")]
    Unreachable {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("Board server reported: {0}")]
    Server(String),

    #[error("Unexpected reply from board server: {0:?}")]
    Protocol(String),
}

impl BoardError {
    /// True when the server could not be reached at all.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, BoardError::Unreachable { .. })
    }
}

pub type Result<T> = std::result::Result<T, BoardError>;
