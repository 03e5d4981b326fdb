//! Board clients.

use crate::error::{BoardError, Result};
use crate::protocol::{tail_entries, BoardRequest, END_MARKER};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

/// Anything that can show and append board entries.
#[async_trait]
pub trait Board: Send + Sync {
    /// Whole board, or only the last `last` entries.
    async fn view(&self, last: Option<usize>) -> Result<String>;

    /// Append one entry.
    async fn post(&self, entry: &str) -> Result<()>;
}

/// Talks to a [`BoardServer`](crate::BoardServer), one connection per request.
#[derive(Clone, Debug)]
pub struct TcpBoard {
    addr: String,
    io_timeout: Duration,
}

impl TcpBoard {
    pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            io_timeout: Self::DEFAULT_IO_TIMEOUT,
        }
    }

    pub fn with_io_timeout(mut self, io_timeout: Duration) -> Self {
        self.io_timeout = io_timeout;
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn connect(&self, request: &BoardRequest) -> Result<BufReader<TcpStream>> {
        let mut stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|source| self.unreachable(source))?;
        debug!(addr = %self.addr, %request, "board request");
        stream
            .write_all(format!("{}\n", request).as_bytes())
            .await
            .map_err(|source| self.unreachable(source))?;
        Ok(BufReader::new(stream))
    }

    async fn exchange(&self, request: BoardRequest) -> Result<Option<String>> {
        let mut reader = self.connect(&request).await?;
        let header = read_line(&mut reader).await?;

        if let Some(code) = header.strip_prefix("ERR ") {
            return Err(BoardError::Server(code.to_string()));
        }
        match request {
            BoardRequest::Post { .. } if header == "OK" => Ok(None),
            BoardRequest::View { .. } => {
                let size: usize = header
                    .strip_prefix("OK ")
                    .and_then(|n| n.parse().ok())
                    .ok_or_else(|| BoardError::Protocol(header.clone()))?;

                let mut body = vec![0u8; size];
                reader.read_exact(&mut body).await?;
                let trailer = read_line(&mut reader).await?;
                if trailer != END_MARKER {
                    return Err(BoardError::Protocol(trailer));
                }
                String::from_utf8(body)
                    .map(Some)
                    .map_err(|e| BoardError::Protocol(e.to_string()))
            }
            _ => Err(BoardError::Protocol(header)),
        }
    }

    async fn timed(&self, request: BoardRequest) -> Result<Option<String>> {
        tokio::time::timeout(self.io_timeout, self.exchange(request))
            .await
            .map_err(|_| self.unreachable(io::ErrorKind::TimedOut.into()))?
    }

    fn unreachable(&self, source: io::Error) -> BoardError {
        BoardError::Unreachable {
            addr: self.addr.clone(),
            source,
        }
    }
}

async fn read_line(reader: &mut BufReader<TcpStream>) -> Result<String> {
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Err(BoardError::Protocol("connection closed".into()));
    }
    Ok(line.trim_end_matches(['\n', '\r']).to_string())
}

#[async_trait]
impl Board for TcpBoard {
    async fn view(&self, last: Option<usize>) -> Result<String> {
        let request = BoardRequest::View { last };
        Ok(self.timed(request).await?.unwrap_or_default())
    }

    async fn post(&self, entry: &str) -> Result<()> {
        self.timed(BoardRequest::post(entry)).await.map(|_| ())
    }
}

/// In-process board.
#[derive(Debug, Default)]
pub struct MemoryBoard {
    content: Mutex<String>,
}

impl MemoryBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entries in posting order.
    pub fn entries(&self) -> Vec<String> {
        self.content.lock().lines().map(str::to_string).collect()
    }
}

#[async_trait]
impl Board for MemoryBoard {
    async fn view(&self, last: Option<usize>) -> Result<String> {
        let content = self.content.lock();
        Ok(match last {
            Some(count) => tail_entries(&content, count).to_string(),
            None => content.clone(),
        })
    }

    async fn post(&self, entry: &str) -> Result<()> {
        let mut content = self.content.lock();
        content.push_str(entry);
        content.push('\n');
        Ok(())
    }
}
