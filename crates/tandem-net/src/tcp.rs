//! Newline-framed TCP links.
//!
//! Each node keeps one outbound connection to its peer (see
//! [`connect_with_retry`] and [`spawn_reconnecting_writer`]) and one listener
//! that accepts the peer's outbound connection (see [`serve`]).

use crate::codec::PeerLineCodec;
use crate::error::{NetError, Result};
use crate::link::LineHandler;
use crate::memory::ChannelSink;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};
use tracing::{debug, info, warn};

/// Longest line accepted from the wire.
pub const MAX_LINE_LENGTH: usize = 8192;

/// Pause after a failed `accept`, so a persistent error does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// How to keep dialing a peer that is not up yet.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Pause between attempts.
    pub interval: Duration,
    /// Give up after this many failed attempts; `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    pub fn forever(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
        }
    }

    pub fn limited(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: Some(max_attempts),
        }
    }
}

/// Bind a listener on `addr` (`host:port`).
pub async fn bind(addr: &str) -> Result<TcpListener> {
    TcpListener::bind(addr).await.map_err(|source| NetError::Bind {
        addr: addr.to_string(),
        source,
    })
}

/// Dial `addr` until it answers, so the two nodes can start in any order.
pub async fn connect_with_retry(addr: &str, policy: &RetryPolicy) -> Result<TcpStream> {
    // Resolve once up front: a bad address will never start working.
    tokio::net::lookup_host(addr)
        .await
        .map_err(|source| NetError::InvalidAddress {
            addr: addr.to_string(),
            source,
        })?;

    let mut attempts = 0u32;
    loop {
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                info!(peer = addr, attempts, "connected to peer");
                return Ok(stream);
            }
            Err(source) => {
                attempts += 1;
                if policy.max_attempts.is_some_and(|max| attempts >= max) {
                    return Err(NetError::Connect {
                        addr: addr.to_string(),
                        attempts,
                        source,
                    });
                }
                info!(
                    peer = addr,
                    attempt = attempts,
                    retry_in_ms = policy.interval.as_millis() as u64,
                    "peer not ready, retrying"
                );
                tokio::time::sleep(policy.interval).await;
            }
        }
    }
}

/// Turn a connected stream into a [`ChannelSink`].
///
/// Lines queued on the sink are written in order by a background task, each
/// with exactly one trailing newline. The task exits when every clone of the
/// sink has been dropped or the socket fails.
pub fn spawn_writer(stream: TcpStream) -> (ChannelSink, JoinHandle<()>) {
    let (sink, mut outbound) = ChannelSink::new();
    let mut lines = FramedWrite::new(stream, LinesCodec::new());

    let handle = tokio::spawn(async move {
        while let Some(line) = outbound.recv().await {
            if let Err(e) = lines.send(line.as_str()).await {
                warn!(error = %e, line = %line, "failed to write line to peer");
                break;
            }
            debug!(line = %line, "sent");
        }
    });

    (sink, handle)
}

/// Like [`spawn_writer`], but a failed write redials `addr` under `policy`
/// and sends the line again on the new connection.
///
/// Lines queued while the link is down go out, in order, once it is back.
/// The task exits when every clone of the sink has been dropped or `policy`
/// gives up.
pub fn spawn_reconnecting_writer(
    stream: TcpStream,
    addr: String,
    policy: RetryPolicy,
) -> (ChannelSink, JoinHandle<()>) {
    let (sink, mut outbound) = ChannelSink::new();

    let handle = tokio::spawn(async move {
        let mut lines = FramedWrite::new(stream, LinesCodec::new());
        while let Some(line) = outbound.recv().await {
            while let Err(e) = lines.send(line.as_str()).await {
                warn!(peer = %addr, error = %e, "lost link to peer, redialing");
                match connect_with_retry(&addr, &policy).await {
                    Ok(stream) => lines = FramedWrite::new(stream, LinesCodec::new()),
                    Err(e) => {
                        warn!(error = %e, "giving up on peer link");
                        return;
                    }
                }
            }
            debug!(line = %line, "sent");
        }
    });

    (sink, handle)
}

/// Accept connections on `listener` forever, feeding each received line to
/// `handler`.
///
/// Connections are served one after the other so lines reach the handler one
/// at a time. When the peer disconnects the loop goes back to accepting,
/// which lets a restarted peer reconnect. Garbled or overlong lines are
/// handled by [`PeerLineCodec`] and never end a connection; failed accepts
/// are logged and retried.
pub async fn serve<H>(listener: TcpListener, handler: Arc<H>)
where
    H: LineHandler + ?Sized,
{
    loop {
        let (stream, remote) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "failed to accept peer connection");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };
        info!(%remote, "peer connected");

        let mut lines = FramedRead::new(stream, PeerLineCodec::new(MAX_LINE_LENGTH));
        while let Some(next) = lines.next().await {
            match next {
                Ok(line) => {
                    debug!(%remote, line = %line, "received");
                    handler.handle_line(&line);
                }
                Err(e) => {
                    warn!(%remote, error = %e, "peer connection failed");
                    break;
                }
            }
        }

        info!(%remote, "peer disconnected");
    }
}
