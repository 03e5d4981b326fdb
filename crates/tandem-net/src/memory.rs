//! In-memory links for testing and simulation.

use crate::link::{strip_terminator, LineHandler, LineSink};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Sink that enqueues lines onto an unbounded channel.
///
/// Enqueueing never blocks, so this is also the outbound half of the TCP link:
/// a writer task drains the channel onto the socket.
#[derive(Clone, Debug)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<String>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// True once the receiving side has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl LineSink for ChannelSink {
    fn send_line(&self, line: &str) {
        if self.tx.send(strip_terminator(line).to_string()).is_err() {
            warn!(line = strip_terminator(line), "link closed, dropping outbound line");
        }
    }
}

/// Sink that keeps every line it is given. Lines are stored without their
/// terminator.
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines sent so far.
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Drain and return the lines sent so far.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock())
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().is_empty()
    }
}

impl LineSink for RecordingSink {
    fn send_line(&self, line: &str) {
        self.lines.lock().push(strip_terminator(line).to_string());
    }
}

/// One end of an in-memory link: the sink writes to the *other* end's inbound
/// queue.
#[derive(Debug)]
pub struct LinkEnd {
    pub sink: ChannelSink,
    pub inbound: mpsc::UnboundedReceiver<String>,
}

impl LinkEnd {
    pub fn split(self) -> (ChannelSink, mpsc::UnboundedReceiver<String>) {
        (self.sink, self.inbound)
    }
}

/// Create two connected link ends.
pub fn link_pair() -> (LinkEnd, LinkEnd) {
    let (to_b, b_inbound) = ChannelSink::new();
    let (to_a, a_inbound) = ChannelSink::new();

    (
        LinkEnd {
            sink: to_b,
            inbound: a_inbound,
        },
        LinkEnd {
            sink: to_a,
            inbound: b_inbound,
        },
    )
}

/// Spawn a task that hands every queued line to `handler`, one at a time,
/// until the sending side is dropped.
pub fn pump<H>(mut inbound: mpsc::UnboundedReceiver<String>, handler: Arc<H>) -> JoinHandle<()>
where
    H: LineHandler + ?Sized,
{
    tokio::spawn(async move {
        while let Some(line) = inbound.recv().await {
            handler.handle_line(&line);
        }
        debug!("in-memory link drained");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Collect(Mutex<Vec<String>>);

    impl LineHandler for Collect {
        fn handle_line(&self, line: &str) {
            self.0.lock().push(line.to_string());
        }
    }

    #[test]
    fn test_recording_sink() {
        let sink = RecordingSink::new();
        sink.send_line("REQUEST 1 1\n");
        sink.send_line("RELEASE 1");

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.lines(), vec!["REQUEST 1 1", "RELEASE 1"]);
        assert_eq!(sink.take().len(), 2);
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_link_pair_crosses_over() {
        let (a, b) = link_pair();
        let (sink_a, mut inbound_a) = a.split();
        let (sink_b, mut inbound_b) = b.split();

        sink_a.send_line("from a\n");
        sink_b.send_line("from b");

        assert_eq!(inbound_b.recv().await.unwrap(), "from a");
        assert_eq!(inbound_a.recv().await.unwrap(), "from b");
    }

    #[tokio::test]
    async fn test_pump_preserves_order() {
        let (sink, inbound) = ChannelSink::new();
        let collected = Arc::new(Collect::default());
        let handle = pump(inbound, collected.clone());

        for i in 0..5 {
            sink.send_line(&format!("line {}", i));
        }
        drop(sink);
        handle.await.unwrap();

        let lines = collected.0.lock().clone();
        assert_eq!(lines, (0..5).map(|i| format!("line {}", i)).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_send_after_close_is_dropped() {
        let (sink, inbound) = ChannelSink::new();
        drop(inbound);
        assert!(sink.is_closed());
        // must not panic
        sink.send_line("REPLY 1 2");
    }
}
