//! The Ricart–Agrawala engine.
//!
//! ```text
//! Released --acquire()--> Wanted --(REPLY)--> Held --release()--> Released
//! Wanted   --(timeout or dropped acquire)--> Released
//! ```
//!
//! All protocol state sits behind one mutex. Every decision that reads the
//! phase (reply or defer, granted or timed out) is made while holding it, and
//! outbound lines are queued on the sink before it is released, so each line
//! leaves in order and carries the clock value of its own transition. The
//! lock is never held across an `.await`.
//!
//! A REPLY echoes the timestamp of the REQUEST it answers. A node's request
//! timestamps strictly increase, so only the REPLY naming the current request
//! can grant it; answers to withdrawn requests are ignored whenever they land.

use crate::config::EngineConfig;
use crate::error::{DmeError, Result};
use crate::state::{EngineSnapshot, Phase};
use parking_lot::Mutex;
use std::fmt;
use std::time::Duration;
use tandem_core::{LamportClock, Message, NodeId, RequestStamp};
use tandem_net::{strip_terminator, LineHandler, LineSink};
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct State {
    clock: LamportClock,
    phase: Phase,
    request: Option<RequestStamp>,
    deferred: Option<RequestStamp>,
    /// Wakes the suspended `acquire`; taken by the REPLY that grants it.
    grant: Option<oneshot::Sender<()>>,
}

/// One node's mutual-exclusion engine.
///
/// Shared by reference (usually behind an `Arc`) between the local caller and
/// the transport's receive loop.
pub struct Engine<S: LineSink> {
    config: EngineConfig,
    sink: S,
    state: Mutex<State>,
}

impl<S: LineSink> Engine<S> {
    /// Create an engine that talks to its peer through `sink`.
    pub fn new(config: EngineConfig, sink: S) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            sink,
            state: Mutex::new(State::default()),
        })
    }

    pub fn self_id(&self) -> NodeId {
        self.config.self_id
    }

    pub fn peer_id(&self) -> NodeId {
        self.config.peer_id
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The outbound sink this engine writes to.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn phase(&self) -> Phase {
        self.state.lock().phase
    }

    /// Current Lamport clock value.
    pub fn clock(&self) -> u64 {
        self.state.lock().clock.now()
    }

    /// Consistent view of the whole protocol state.
    pub fn snapshot(&self) -> EngineSnapshot {
        let state = self.state.lock();
        EngineSnapshot {
            self_id: self.config.self_id,
            peer_id: self.config.peer_id,
            clock: state.clock.now(),
            phase: state.phase,
            request: state.request,
            deferred: state.deferred,
        }
    }

    /// Ask the peer for the critical section and wait for its REPLY.
    ///
    /// Returns `Ok(())` once this node is [`Phase::Held`]. Fails with
    /// [`DmeError::AcquireTimeout`] if the peer stays silent for the configured
    /// bound, leaving the engine [`Phase::Released`], and with
    /// [`DmeError::Busy`] if an acquire is already in flight or the section is
    /// already held.
    ///
    /// Dropping the returned future while it waits withdraws the request the
    /// same way a timeout does.
    pub async fn acquire(&self) -> Result<()> {
        let granted = self.begin_acquire()?;
        let mut pending = PendingAcquire {
            engine: self,
            armed: true,
        };

        let started = Instant::now();
        // Whether the slot fired or the timer did, the phase decides below.
        let _ = tokio::time::timeout(self.config.acquire_timeout(), granted).await;

        pending.armed = false;
        self.finish_acquire(started.elapsed())
    }

    /// Acquire and return a guard that releases when dropped.
    pub async fn enter(&self) -> Result<CriticalSection<'_, S>> {
        self.acquire().await?;
        Ok(CriticalSection { engine: self })
    }

    /// Leave the critical section.
    ///
    /// Sends RELEASE and any REPLY owed to the peer. Does nothing unless the
    /// engine is [`Phase::Held`].
    pub fn release(&self) {
        let mut state = self.state.lock();
        if state.phase != Phase::Held {
            debug!(phase = %state.phase, "release ignored");
            return;
        }
        self.release_locked(&mut state);
    }

    /// Process one line received from the peer.
    ///
    /// Malformed lines, and lines from anyone but the configured peer, are
    /// logged and dropped without touching state.
    pub fn handle_incoming(&self, line: &str) {
        let message = match Message::parse(line) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, line = strip_terminator(line), "dropping malformed line");
                return;
            }
        };

        if message.sender() != self.config.peer_id {
            warn!(
                from = %message.sender(),
                peer = %self.config.peer_id,
                line = %message,
                "dropping message from unknown node"
            );
            return;
        }

        debug!(line = %message, "<-");
        let mut state = self.state.lock();
        match message {
            Message::Request { timestamp, from } => {
                self.on_request(&mut state, RequestStamp::new(timestamp, from))
            }
            Message::Reply { timestamp, .. } => self.on_reply(&mut state, timestamp),
            Message::Release { timestamp, .. } => self.on_release(&mut state, timestamp),
        }
    }

    fn begin_acquire(&self) -> Result<oneshot::Receiver<()>> {
        let mut state = self.state.lock();
        if state.phase != Phase::Released {
            warn!(phase = %state.phase, "acquire rejected");
            return Err(DmeError::Busy { phase: state.phase });
        }

        let (tx, rx) = oneshot::channel();
        let stamp = RequestStamp::new(state.clock.tick(), self.config.self_id);
        state.phase = Phase::Wanted;
        state.request = Some(stamp);
        state.grant = Some(tx);
        self.send(Message::request(stamp));

        info!(ts = stamp.timestamp, peer = %self.config.peer_id, "requesting critical section");
        Ok(rx)
    }

    fn finish_acquire(&self, waited: Duration) -> Result<()> {
        let mut state = self.state.lock();
        match state.phase {
            Phase::Held => {
                info!(waited_ms = waited.as_millis() as u64, "entered critical section");
                Ok(())
            }
            Phase::Wanted => {
                warn!(
                    peer = %self.config.peer_id,
                    waited_ms = waited.as_millis() as u64,
                    "timed out waiting for REPLY"
                );
                self.abandon(&mut state);
                Err(self.timeout_error(waited))
            }
            // Granted and then released through another handle before this
            // task resumed; the caller never owned the section.
            Phase::Released => Err(self.timeout_error(waited)),
        }
    }

    fn timeout_error(&self, waited: Duration) -> DmeError {
        DmeError::AcquireTimeout {
            peer: self.config.peer_id,
            waited,
        }
    }

    /// Called when an acquire future is dropped mid-wait.
    fn cancel_acquire(&self) {
        let mut state = self.state.lock();
        match state.phase {
            Phase::Wanted => {
                info!("acquire dropped while waiting, withdrawing request");
                self.abandon(&mut state);
            }
            Phase::Held => {
                info!("acquire dropped after grant, releasing");
                self.release_locked(&mut state);
            }
            Phase::Released => {}
        }
    }

    /// Withdraw our own request. We no longer compete, so a deferred peer
    /// request is answered now.
    fn abandon(&self, state: &mut State) {
        state.phase = Phase::Released;
        state.request = None;
        state.grant = None;
        if let Some(owed) = state.deferred.take() {
            info!(to = %owed.node, ts = owed.timestamp, "sending deferred REPLY");
            self.send(Message::reply(owed, self.config.self_id));
        }
    }

    fn release_locked(&self, state: &mut State) {
        state.clock.tick();
        state.phase = Phase::Released;
        state.request = None;
        self.send(Message::release(self.config.self_id));
        info!(clock = state.clock.now(), "left critical section");

        if let Some(owed) = state.deferred.take() {
            info!(to = %owed.node, ts = owed.timestamp, "sending deferred REPLY");
            self.send(Message::reply(owed, self.config.self_id));
        }
    }

    fn on_request(&self, state: &mut State, incoming: RequestStamp) {
        state.clock.observe(incoming.timestamp);

        // The peer only re-requests after withdrawing its previous request,
        // and nothing waits on an answer to that one.
        if let Some(superseded) = state.deferred.take() {
            debug!(%superseded, "dropping superseded request");
        }

        let defer = match state.phase {
            Phase::Held => true,
            Phase::Wanted => state
                .request
                .is_some_and(|own| own.has_priority_over(&incoming)),
            Phase::Released => false,
        };

        if defer {
            state.deferred = Some(incoming);
            info!(
                from = %incoming.node,
                ts = incoming.timestamp,
                phase = %state.phase,
                "REQUEST deferred"
            );
        } else {
            self.send(Message::reply(incoming, self.config.self_id));
            info!(from = %incoming.node, ts = incoming.timestamp, "REQUEST granted");
        }
    }

    fn on_reply(&self, state: &mut State, timestamp: u64) {
        if state.phase != Phase::Wanted {
            debug!(phase = %state.phase, ts = timestamp, "stale REPLY ignored");
            return;
        }
        if state.request.map(|own| own.timestamp) != Some(timestamp) {
            debug!(ts = timestamp, "REPLY for a withdrawn request ignored");
            return;
        }

        state.phase = Phase::Held;
        if let Some(grant) = state.grant.take() {
            // The receiver is gone only if the acquire was dropped, and then
            // its guard releases on our behalf.
            let _ = grant.send(());
        }
    }

    fn on_release(&self, state: &mut State, timestamp: Option<u64>) {
        if let Some(ts) = timestamp {
            state.clock.observe(ts);
        }
        debug!("peer left critical section");

        if let Some(owed) = state.deferred.take() {
            info!(to = %owed.node, ts = owed.timestamp, "sending deferred REPLY after RELEASE");
            self.send(Message::reply(owed, self.config.self_id));
        }
    }

    fn send(&self, message: Message) {
        debug!(line = %message, "->");
        self.sink.send_line(&message.to_string());
    }
}

impl<S: LineSink> LineHandler for Engine<S> {
    fn handle_line(&self, line: &str) {
        self.handle_incoming(line);
    }
}

impl<S: LineSink> fmt::Debug for Engine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("state", &self.snapshot())
            .finish()
    }
}

/// Rolls an in-flight acquire back if its future is dropped.
struct PendingAcquire<'a, S: LineSink> {
    engine: &'a Engine<S>,
    armed: bool,
}

impl<S: LineSink> Drop for PendingAcquire<'_, S> {
    fn drop(&mut self) {
        if self.armed {
            self.engine.cancel_acquire();
        }
    }
}

/// Proof of holding the critical section; releases on drop.
#[must_use = "the critical section is released as soon as the guard is dropped"]
pub struct CriticalSection<'a, S: LineSink> {
    engine: &'a Engine<S>,
}

impl<S: LineSink> CriticalSection<'_, S> {
    /// Release explicitly.
    pub fn exit(self) {
        drop(self);
    }
}

impl<S: LineSink> Drop for CriticalSection<'_, S> {
    fn drop(&mut self) {
        self.engine.release();
    }
}

impl<S: LineSink> fmt::Debug for CriticalSection<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CriticalSection")
            .field("node", &self.engine.self_id())
            .finish()
    }
}
