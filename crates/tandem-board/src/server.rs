//! The board server: one append-only text file behind a TCP listener.

use crate::error::Result;
use crate::protocol::{tail_entries, BoardRequest, BoardResponse, ErrorCode};
use futures::StreamExt;
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tandem_net::MAX_LINE_LENGTH;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_util::codec::{FramedRead, LinesCodec};
use tracing::{debug, info, warn};

/// The board file plus the lock that serializes every read and append.
#[derive(Clone, Debug)]
struct BoardFile {
    path: Arc<PathBuf>,
    lock: Arc<Mutex<()>>,
}

impl BoardFile {
    fn new(path: PathBuf) -> Self {
        Self {
            path: Arc::new(path),
            lock: Arc::new(Mutex::new(())),
        }
    }

    async fn read(&self, last: Option<usize>) -> io::Result<String> {
        let _guard = self.lock.lock().await;
        ensure_exists(&self.path).await?;
        let content = fs::read_to_string(self.path.as_path()).await?;
        Ok(match last {
            Some(count) => tail_entries(&content, count).to_string(),
            None => content,
        })
    }

    async fn append(&self, entry: &str) -> io::Result<()> {
        let _guard = self.lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path.as_path())
            .await?;
        file.write_all(format!("{}\n", entry).as_bytes()).await?;
        file.flush().await
    }

    async fn execute(&self, request: BoardRequest) -> BoardResponse {
        match request {
            BoardRequest::View { last } => match self.read(last).await {
                Ok(content) => {
                    info!(bytes = content.len(), ?last, "VIEW served");
                    BoardResponse::Content(content)
                }
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "cannot read board");
                    BoardResponse::Err(ErrorCode::Open)
                }
            },
            BoardRequest::Post { entry } => match self.append(&entry).await {
                Ok(()) => {
                    info!(%entry, "POST appended");
                    BoardResponse::Ok
                }
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "cannot append to board");
                    BoardResponse::Err(ErrorCode::Open)
                }
            },
        }
    }
}

async fn ensure_exists(path: &Path) -> io::Result<()> {
    if fs::try_exists(path).await? {
        return Ok(());
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    info!(path = %path.display(), "created board file");
    Ok(())
}

/// Serves one board file. Every connection carries exactly one request.
#[derive(Debug)]
pub struct BoardServer {
    listener: TcpListener,
    file: BoardFile,
}

impl BoardServer {
    /// Bind `addr` and create the board file if it is missing.
    pub async fn bind(addr: &str, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        ensure_exists(&path).await?;
        let listener = tandem_net::bind(addr).await?;
        info!(%addr, path = %path.display(), "board server listening");

        Ok(Self {
            listener,
            file: BoardFile::new(path),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn path(&self) -> &Path {
        self.file.path.as_path()
    }

    /// Accept connections until the task is dropped.
    pub async fn run(self) -> Result<()> {
        loop {
            let (stream, remote) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    continue;
                }
            };
            debug!(%remote, "board connection accepted");

            let file = self.file.clone();
            tokio::spawn(async move {
                if let Err(e) = serve_connection(stream, file).await {
                    warn!(%remote, error = %e, "board connection failed");
                }
            });
        }
    }
}

async fn serve_connection(stream: TcpStream, file: BoardFile) -> io::Result<()> {
    let (read, mut write) = stream.into_split();
    let mut lines = FramedRead::new(read, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));

    let response = match lines.next().await {
        None => return Ok(()),
        Some(Err(e)) => {
            warn!(error = %e, "unreadable request");
            BoardResponse::Err(ErrorCode::BadCommand)
        }
        Some(Ok(line)) => match BoardRequest::parse(&line) {
            Some(request) => file.execute(request).await,
            None => {
                warn!(%line, "unknown board command");
                BoardResponse::Err(ErrorCode::BadCommand)
            }
        },
    };

    write.write_all(response.encode().as_bytes()).await?;
    write.shutdown().await
}
