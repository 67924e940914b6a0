//! The in-process transport engine.
//!
//! Process-wide state behind all sockets: the descriptor table, the inproc
//! endpoint registry, per-socket message queues and the readiness condvar
//! the poll and blocking I/O paths wait on. The engine is initialized on
//! first use and torn down by [`Engine::term`].
//!
//! Descriptors are plain integers, allocated monotonically and never reused
//! for the lifetime of the process, so a stale descriptor can only ever miss
//! the table; it cannot alias a newer socket.
//!
//! Pattern semantics implemented here: PAIR (exclusive peer), PUSH/PULL
//! (round-robin pipeline, FIFO per stream), PUB/SUB (fan-out with prefix
//! subscription filtering), BUS (fan-out), REQ/REP and SURVEYOR/RESPONDENT
//! (routed replies; REQ and REP enforce send/recv alternation).

use std::collections::HashMap;
use std::ops::{BitAnd, BitOr};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::{Condvar, Mutex};
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::flags::Flags;
use crate::options::{Level, OptionName, OptionValue, Opts};
use crate::pattern::{Domain, Pattern};

/// Raw socket descriptor. Valid descriptors are non-negative.
pub type Fd = i32;

/// Messages a socket's inbound queue holds before senders see backpressure.
///
/// The buffer-size options are byte hints carried for transports that use
/// them; the inproc queue bounds messages, not bytes.
pub const QUEUE_DEPTH: usize = 1024;

/// Identity of one bound or connected endpoint within a socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EndpointId(i32);

impl EndpointId {
    /// Numeric endpoint identity, unique within its socket.
    #[must_use]
    pub const fn value(self) -> i32 {
        self.0
    }
}

/// Readiness interest/result bit set (`NN_POLLIN` / `NN_POLLOUT` values).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Interest(u8);

impl Interest {
    pub const NONE: Interest = Interest(0);
    pub const READABLE: Interest = Interest(1);
    pub const WRITABLE: Interest = Interest(2);

    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn contains(self, other: Interest) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Interest {
    type Output = Interest;

    fn bitor(self, rhs: Interest) -> Interest {
        Interest(self.0 | rhs.0)
    }
}

impl BitAnd for Interest {
    type Output = Interest;

    fn bitand(self, rhs: Interest) -> Interest {
        Interest(self.0 & rhs.0)
    }
}

/// One entry of the engine-level multiplex call. Positionally matches the
/// caller's entry list; `revents` is written back on completion.
#[derive(Debug, Clone)]
pub struct PollDescriptor {
    pub fd: Fd,
    pub interest: Interest,
    pub revents: Interest,
}

impl PollDescriptor {
    #[must_use]
    pub const fn new(fd: Fd, interest: Interest) -> Self {
        Self {
            fd,
            interest,
            revents: Interest::NONE,
        }
    }
}

/// Send/recv alternation for the request-style patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Exchange {
    /// REQ may send; REP/RESPONDENT may recv.
    Ready,
    /// REQ sent and must recv next.
    AwaitingReply,
    /// REP/RESPONDENT received and must send next.
    AwaitingSend,
}

#[derive(Debug)]
enum EndpointRecord {
    /// Listening inproc name owned by this socket.
    Bound(String),
    /// Link to the binder socket this endpoint connected to.
    Connected(Fd),
}

/// Peer links and endpoint bookkeeping, guarded by one mutex per socket.
struct Links {
    peers: Vec<Fd>,
    endpoints: HashMap<i32, EndpointRecord>,
    next_eid: i32,
    rr_cursor: usize,
    last_peer: Option<Fd>,
    exchange: Exchange,
}

struct SocketState {
    fd: Fd,
    pattern: Pattern,
    opts: Mutex<Opts>,
    queue_tx: flume::Sender<(Fd, Bytes)>,
    queue_rx: flume::Receiver<(Fd, Bytes)>,
    links: Mutex<Links>,
}

static ENGINE: Lazy<Engine> = Lazy::new(Engine::new);

/// The process-wide engine instance, initialized on first use.
pub fn engine() -> &'static Engine {
    &ENGINE
}

/// Process-wide transport state.
///
/// Lock ordering: the wakeup mutex may be held while taking a socket's
/// `links` or `opts` mutex, never the other way round. Delivery paths
/// release per-socket locks before notifying waiters.
pub struct Engine {
    sockets: DashMap<Fd, Arc<SocketState>>,
    inproc: DashMap<String, Fd>,
    next_fd: AtomicI32,
    terminated: AtomicBool,
    wakeup: Mutex<()>,
    cond: Condvar,
}

impl Engine {
    fn new() -> Self {
        Self {
            sockets: DashMap::new(),
            inproc: DashMap::new(),
            next_fd: AtomicI32::new(0),
            terminated: AtomicBool::new(false),
            wakeup: Mutex::new(()),
            cond: Condvar::new(),
        }
    }

    fn check_live(&self) -> Result<()> {
        if self.terminated.load(Ordering::SeqCst) {
            return Err(Error::Terminated);
        }
        Ok(())
    }

    fn socket(&self, fd: Fd) -> Result<Arc<SocketState>> {
        self.check_live()?;
        self.sockets
            .get(&fd)
            .map(|e| Arc::clone(e.value()))
            .ok_or(Error::ClosedSocket)
    }

    /// Wake every blocked poll/send/recv so it can re-examine its condition.
    fn wake_all(&self) {
        let _guard = self.wakeup.lock();
        self.cond.notify_all();
    }

    /// Retry `attempt` until it produces an outcome, waiting on the engine
    /// condvar in between. `attempt` must not notify the condvar itself; it
    /// can run with the wakeup mutex held.
    fn block_on<T>(
        &self,
        flags: Flags,
        deadline: Option<Instant>,
        mut attempt: impl FnMut() -> Option<Result<T>>,
    ) -> Result<T> {
        loop {
            if let Some(outcome) = attempt() {
                return outcome;
            }
            if flags.dont_wait() {
                return Err(Error::WouldBlock);
            }
            let mut guard = self.wakeup.lock();
            // Re-check with the lock held so a wakeup between the first
            // attempt and the wait cannot be missed.
            if let Some(outcome) = attempt() {
                return outcome;
            }
            match deadline {
                None => self.cond.wait(&mut guard),
                Some(d) => {
                    if self.cond.wait_until(&mut guard, d).timed_out() {
                        return Err(Error::TimedOut);
                    }
                }
            }
        }
    }

    // ---------------------------------------------------------------------
    // Socket lifecycle
    // ---------------------------------------------------------------------

    /// Create a socket and return its descriptor.
    pub fn create(&self, domain: Domain, pattern: Pattern) -> Result<Fd> {
        self.check_live()?;
        let fd = self.next_fd.fetch_add(1, Ordering::Relaxed);
        let (queue_tx, queue_rx) = flume::bounded(QUEUE_DEPTH);
        let state = SocketState {
            fd,
            pattern,
            opts: Mutex::new(Opts::new(domain, pattern, fd)),
            queue_tx,
            queue_rx,
            links: Mutex::new(Links {
                peers: Vec::new(),
                endpoints: HashMap::new(),
                next_eid: 1,
                rr_cursor: 0,
                last_peer: None,
                exchange: Exchange::Ready,
            }),
        };
        self.sockets.insert(fd, Arc::new(state));
        debug!("[ENGINE] created {} socket fd={} domain={:?}", pattern, fd, domain);
        Ok(fd)
    }

    /// Release a descriptor: unregister its bound names, unlink its peers
    /// and drop its queue. Blocked calls on the socket fail once woken.
    pub fn close(&self, fd: Fd) -> Result<()> {
        self.check_live()?;
        let Some((_, state)) = self.sockets.remove(&fd) else {
            return Err(Error::ClosedSocket);
        };
        // Take the records first; unlinking peers takes their locks and
        // must not nest inside ours.
        let records: Vec<EndpointRecord> = {
            let mut links = state.links.lock();
            links.peers.clear();
            std::mem::take(&mut links.endpoints).into_values().collect()
        };
        for record in records {
            self.release_endpoint(fd, record);
        }
        debug!("[ENGINE] closed socket fd={}", fd);
        self.wake_all();
        Ok(())
    }

    fn release_endpoint(&self, fd: Fd, record: EndpointRecord) {
        match record {
            EndpointRecord::Bound(name) => {
                self.inproc.remove_if(&name, |_, owner| *owner == fd);
            }
            EndpointRecord::Connected(peer_fd) => {
                if let Some(peer) = self.sockets.get(&peer_fd).map(|e| Arc::clone(e.value())) {
                    let mut links = peer.links.lock();
                    if let Some(pos) = links.peers.iter().position(|p| *p == fd) {
                        links.peers.remove(pos);
                    }
                }
            }
        }
    }

    /// Register a listening endpoint. Only `inproc://` is served in-process;
    /// other schemes parse but report their transport as unavailable.
    pub fn bind(&self, fd: Fd, addr: &str) -> Result<EndpointId> {
        let state = self.socket(fd)?;
        let name = match Endpoint::parse(addr)? {
            Endpoint::Inproc(name) => name,
            other => return Err(Error::TransportNotSupported(other.to_string())),
        };
        match self.inproc.entry(name.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(Error::AddrInUse(addr.to_string()));
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(fd);
            }
        }
        let eid = {
            let mut links = state.links.lock();
            let eid = links.next_eid;
            links.next_eid += 1;
            links.endpoints.insert(eid, EndpointRecord::Bound(name));
            eid
        };
        debug!("[ENGINE] fd={} bound {} (eid={})", fd, addr, eid);
        self.wake_all();
        Ok(EndpointId(eid))
    }

    /// Connect to a previously bound endpoint, linking the two sockets.
    pub fn connect(&self, fd: Fd, addr: &str) -> Result<EndpointId> {
        let state = self.socket(fd)?;
        let name = match Endpoint::parse(addr)? {
            Endpoint::Inproc(name) => name,
            other => return Err(Error::TransportNotSupported(other.to_string())),
        };
        let binder_fd = self
            .inproc
            .get(&name)
            .map(|e| *e.value())
            .ok_or_else(|| Error::ConnectionRefused(addr.to_string()))?;
        if binder_fd == fd {
            return Err(Error::InvalidArgument(
                "socket cannot connect to its own endpoint".to_string(),
            ));
        }
        let binder = self
            .sockets
            .get(&binder_fd)
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| Error::ConnectionRefused(addr.to_string()))?;
        if !state.pattern.is_compatible(binder.pattern) {
            return Err(Error::InvalidArgument(format!(
                "{} socket cannot connect to a {} binder",
                state.pattern, binder.pattern
            )));
        }
        // PAIR takes at most one live peer per side. Each side is checked
        // under its own lock; the two links locks are never nested.
        {
            let mut links = state.links.lock();
            links.peers.retain(|p| self.sockets.contains_key(p));
            if state.pattern == Pattern::Pair && !links.peers.is_empty() {
                return Err(Error::InvalidArgument(
                    "PAIR socket already has a peer".to_string(),
                ));
            }
        }
        {
            let mut links = binder.links.lock();
            links.peers.retain(|p| self.sockets.contains_key(p));
            if binder.pattern == Pattern::Pair && !links.peers.is_empty() {
                return Err(Error::InvalidArgument(
                    "PAIR binder already has a peer".to_string(),
                ));
            }
            links.peers.push(fd);
        }
        state.links.lock().peers.push(binder_fd);
        let eid = {
            let mut links = state.links.lock();
            let eid = links.next_eid;
            links.next_eid += 1;
            links
                .endpoints
                .insert(eid, EndpointRecord::Connected(binder_fd));
            eid
        };
        debug!("[ENGINE] fd={} connected to {} (eid={})", fd, addr, eid);
        self.wake_all();
        Ok(EndpointId(eid))
    }

    /// Tear down one endpoint without closing the socket.
    pub fn shutdown(&self, fd: Fd, eid: EndpointId) -> Result<()> {
        let state = self.socket(fd)?;
        let record = state
            .links
            .lock()
            .endpoints
            .remove(&eid.value())
            .ok_or_else(|| Error::InvalidArgument(format!("no such endpoint: {}", eid.value())))?;
        if let EndpointRecord::Connected(peer_fd) = &record {
            let mut links = state.links.lock();
            if let Some(pos) = links.peers.iter().position(|p| p == peer_fd) {
                links.peers.remove(pos);
            }
        }
        self.release_endpoint(fd, record);
        debug!("[ENGINE] fd={} shut down eid={}", fd, eid.value());
        self.wake_all();
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Message I/O
    // ---------------------------------------------------------------------

    /// Transmit one message. Fan-out patterns deliver to every eligible
    /// peer without blocking; unicast patterns pick one target and apply
    /// backpressure per the send-timeout option.
    pub fn send(&self, fd: Fd, msg: Bytes, flags: Flags) -> Result<usize> {
        let state = self.socket(fd)?;
        if !state.pattern.can_send() {
            return Err(Error::NotSupported);
        }
        let len = msg.len();

        if state.pattern.fans_out() {
            self.deliver_fan_out(&state, msg);
            self.wake_all();
            return Ok(len);
        }

        if matches!(state.pattern, Pattern::Rep | Pattern::Respondent) {
            self.deliver_reply(&state, msg)?;
            self.wake_all();
            return Ok(len);
        }

        // PAIR / PUSH / REQ: single target, round-robin across peers.
        let deadline = {
            let timeout = state.opts.lock().send_timeout;
            ms_deadline(timeout)
        };
        let result = self.block_on(flags, deadline, || self.try_deliver(&state, &msg));
        if result.is_ok() {
            self.wake_all();
        }
        result.map(|()| len)
    }

    /// One delivery attempt for the unicast patterns. `None` means no peer
    /// could take the message right now.
    fn try_deliver(&self, state: &SocketState, msg: &Bytes) -> Option<Result<()>> {
        if self.terminated.load(Ordering::SeqCst) {
            return Some(Err(Error::Terminated));
        }
        if !self.sockets.contains_key(&state.fd) {
            return Some(Err(Error::ClosedSocket));
        }
        let mut links = state.links.lock();
        if state.pattern == Pattern::Req && links.exchange != Exchange::Ready {
            return Some(Err(Error::BadState));
        }
        links.peers.retain(|p| self.sockets.contains_key(p));
        let n = links.peers.len();
        if n == 0 {
            return None;
        }
        for i in 0..n {
            let idx = (links.rr_cursor + i) % n;
            let peer_fd = links.peers[idx];
            let Some(peer) = self.sockets.get(&peer_fd).map(|e| Arc::clone(e.value())) else {
                continue;
            };
            if let Some(max) = recv_cap(&peer) {
                if msg.len() > max {
                    // Receive-side size cap: the message is dropped at
                    // delivery, the sender still observes success.
                    warn!(
                        "[ENGINE] fd={} dropping {}-byte message for fd={} (cap {})",
                        state.fd,
                        msg.len(),
                        peer_fd,
                        max
                    );
                    links.rr_cursor = (idx + 1) % n;
                    if state.pattern == Pattern::Req {
                        links.exchange = Exchange::AwaitingReply;
                    }
                    return Some(Ok(()));
                }
            }
            match peer.queue_tx.try_send((state.fd, msg.clone())) {
                Ok(()) => {
                    links.rr_cursor = (idx + 1) % n;
                    if state.pattern == Pattern::Req {
                        links.exchange = Exchange::AwaitingReply;
                    }
                    trace!(
                        "[ENGINE] fd={} delivered {} bytes to fd={}",
                        state.fd,
                        msg.len(),
                        peer_fd
                    );
                    return Some(Ok(()));
                }
                Err(flume::TrySendError::Full(_)) => continue,
                Err(flume::TrySendError::Disconnected(_)) => continue,
            }
        }
        None
    }

    /// Broadcast to every eligible peer; slow or filtered peers are skipped,
    /// never waited on.
    fn deliver_fan_out(&self, state: &SocketState, msg: Bytes) {
        let peers: SmallVec<[Fd; 8]> = {
            let mut links = state.links.lock();
            links.peers.retain(|p| self.sockets.contains_key(p));
            links.peers.iter().copied().collect()
        };
        for peer_fd in peers {
            let Some(peer) = self.sockets.get(&peer_fd).map(|e| Arc::clone(e.value())) else {
                continue;
            };
            if peer.pattern == Pattern::Sub && !peer.opts.lock().subscription_matches(&msg) {
                continue;
            }
            if let Some(max) = recv_cap(&peer) {
                if msg.len() > max {
                    warn!(
                        "[ENGINE] fd={} dropping {}-byte message for fd={} (cap {})",
                        state.fd,
                        msg.len(),
                        peer_fd,
                        max
                    );
                    continue;
                }
            }
            match peer.queue_tx.try_send((state.fd, msg.clone())) {
                Ok(()) => {}
                Err(flume::TrySendError::Full(_)) => {
                    trace!(
                        "[ENGINE] fd={} queue full, dropping fan-out message for fd={}",
                        state.fd,
                        peer_fd
                    );
                }
                Err(flume::TrySendError::Disconnected(_)) => {}
            }
        }
    }

    /// Route a REP/RESPONDENT reply back to the peer the request came from.
    /// A reply to a peer that has since gone away is silently dropped.
    fn deliver_reply(&self, state: &SocketState, msg: Bytes) -> Result<()> {
        let peer_fd = {
            let mut links = state.links.lock();
            if links.exchange != Exchange::AwaitingSend {
                return Err(Error::BadState);
            }
            links.exchange = Exchange::Ready;
            links.last_peer.take()
        };
        let Some(peer_fd) = peer_fd else {
            return Ok(());
        };
        let Some(peer) = self.sockets.get(&peer_fd).map(|e| Arc::clone(e.value())) else {
            trace!("[ENGINE] fd={} reply peer fd={} is gone", state.fd, peer_fd);
            return Ok(());
        };
        if let Some(max) = recv_cap(&peer) {
            if msg.len() > max {
                warn!(
                    "[ENGINE] fd={} dropping {}-byte reply for fd={} (cap {})",
                    state.fd,
                    msg.len(),
                    peer_fd,
                    max
                );
                return Ok(());
            }
        }
        if peer.queue_tx.try_send((state.fd, msg)).is_err() {
            trace!("[ENGINE] fd={} reply queue for fd={} unavailable", state.fd, peer_fd);
        }
        Ok(())
    }

    /// Receive one message, transport-allocated exactly to size.
    pub fn recv(&self, fd: Fd, flags: Flags) -> Result<Bytes> {
        let state = self.socket(fd)?;
        if !state.pattern.can_recv() {
            return Err(Error::NotSupported);
        }
        let deadline = {
            let timeout = state.opts.lock().recv_timeout;
            ms_deadline(timeout)
        };
        let result = self.block_on(flags, deadline, || {
            if self.terminated.load(Ordering::SeqCst) {
                return Some(Err(Error::Terminated));
            }
            if !self.sockets.contains_key(&fd) {
                return Some(Err(Error::ClosedSocket));
            }
            let mut links = state.links.lock();
            match state.pattern {
                Pattern::Req if links.exchange != Exchange::AwaitingReply => {
                    return Some(Err(Error::BadState));
                }
                Pattern::Rep | Pattern::Respondent if links.exchange != Exchange::Ready => {
                    return Some(Err(Error::BadState));
                }
                _ => {}
            }
            match state.queue_rx.try_recv() {
                Ok((from, msg)) => {
                    match state.pattern {
                        Pattern::Req => links.exchange = Exchange::Ready,
                        Pattern::Rep | Pattern::Respondent => {
                            links.exchange = Exchange::AwaitingSend;
                            links.last_peer = Some(from);
                        }
                        _ => {}
                    }
                    Some(Ok(msg))
                }
                Err(flume::TryRecvError::Empty) => None,
                // The socket state owns a sender half, so the channel can
                // only disconnect when the state itself is being dropped.
                Err(flume::TryRecvError::Disconnected) => Some(Err(Error::ClosedSocket)),
            }
        });
        if result.is_ok() {
            // Queue space was freed; blocked senders may proceed.
            self.wake_all();
        }
        result
    }

    // ---------------------------------------------------------------------
    // Options
    // ---------------------------------------------------------------------

    pub fn get_option(&self, fd: Fd, level: Level, name: OptionName) -> Result<OptionValue> {
        let state = self.socket(fd)?;
        self.check_level(&state, level)?;
        let opts = state.opts.lock();
        opts.get(level, name)
    }

    pub fn set_option(
        &self,
        fd: Fd,
        level: Level,
        name: OptionName,
        value: OptionValue,
    ) -> Result<()> {
        let state = self.socket(fd)?;
        self.check_level(&state, level)?;
        state.opts.lock().set(level, name, value)?;
        trace!("[ENGINE] fd={} set option {:?}", fd, name);
        Ok(())
    }

    fn check_level(&self, state: &SocketState, level: Level) -> Result<()> {
        if let Level::Pattern(p) = level {
            if p != state.pattern {
                return Err(Error::InvalidArgument(format!(
                    "level {} does not apply to a {} socket",
                    p, state.pattern
                )));
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Poll
    // ---------------------------------------------------------------------

    /// Block until at least one descriptor is ready, the timeout elapses or
    /// the engine terminates. Entry order is preserved; `revents` of each
    /// entry reflects only that entry's socket. A timeout is the `Ok(0)`
    /// outcome, not an error.
    ///
    /// `timeout_ms` semantics: `0` returns immediately, positive waits up to
    /// that many milliseconds, negative blocks indefinitely.
    pub fn poll(&self, fds: &mut [PollDescriptor], timeout_ms: i32) -> Result<usize> {
        self.check_live()?;
        if fds.is_empty() {
            return Ok(0);
        }
        let deadline = if timeout_ms == 0 {
            Some(Instant::now())
        } else {
            ms_deadline(timeout_ms)
        };
        loop {
            let ready = self.scan(fds)?;
            if ready > 0 {
                return Ok(ready);
            }
            let mut guard = self.wakeup.lock();
            let ready = self.scan(fds)?;
            if ready > 0 {
                return Ok(ready);
            }
            match deadline {
                None => self.cond.wait(&mut guard),
                Some(d) => {
                    if self.cond.wait_until(&mut guard, d).timed_out() {
                        return Ok(0);
                    }
                }
            }
        }
    }

    fn scan(&self, fds: &mut [PollDescriptor]) -> Result<usize> {
        if self.terminated.load(Ordering::SeqCst) {
            return Err(Error::Terminated);
        }
        let mut ready = 0;
        for entry in fds.iter_mut() {
            let state = self
                .sockets
                .get(&entry.fd)
                .map(|e| Arc::clone(e.value()))
                .ok_or(Error::ClosedSocket)?;
            entry.revents = self.readiness(&state) & entry.interest;
            if !entry.revents.is_empty() {
                ready += 1;
            }
        }
        Ok(ready)
    }

    fn readiness(&self, state: &SocketState) -> Interest {
        let mut r = Interest::NONE;
        if state.pattern.can_recv() && !state.queue_rx.is_empty() {
            r = r | Interest::READABLE;
        }
        if state.pattern.can_send() {
            let writable = if state.pattern.fans_out() {
                // Fan-out never applies backpressure: a send always completes.
                true
            } else if matches!(state.pattern, Pattern::Rep | Pattern::Respondent) {
                // Sendable only while a reply is owed.
                state.links.lock().exchange == Exchange::AwaitingSend
            } else {
                let mut links = state.links.lock();
                let sendable =
                    state.pattern != Pattern::Req || links.exchange == Exchange::Ready;
                sendable && {
                    links.peers.retain(|p| self.sockets.contains_key(p));
                    links.peers.iter().any(|p| {
                        self.sockets
                            .get(p)
                            .is_some_and(|peer| !peer.queue_tx.is_full())
                    })
                }
            };
            if writable {
                r = r | Interest::WRITABLE;
            }
        }
        r
    }

    // ---------------------------------------------------------------------
    // Global teardown
    // ---------------------------------------------------------------------

    /// Process-wide shutdown: invalidates every socket and endpoint and
    /// wakes all blocked calls, which then fail with the terminated error.
    ///
    /// Not safe to call while other threads still expect their sockets to
    /// keep working; there is no way to re-initialize afterwards.
    pub fn term(&self) {
        if self.terminated.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("[ENGINE] terminating; dropping {} sockets", self.sockets.len());
        self.inproc.clear();
        self.sockets.clear();
        self.wake_all();
    }
}

/// Receive-side size cap for a peer, if one is configured.
fn recv_cap(peer: &SocketState) -> Option<usize> {
    let max = peer.opts.lock().recv_max_size;
    usize::try_from(max).ok()
}

fn ms_deadline(ms: i32) -> Option<Instant> {
    if ms < 0 {
        None
    } else {
        Some(Instant::now() + Duration::from_millis(ms as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The engine is process-global; each test uses its own inproc names.

    #[test]
    fn create_assigns_fresh_descriptors() {
        let a = engine().create(Domain::Sp, Pattern::Pair).unwrap();
        let b = engine().create(Domain::Sp, Pattern::Pair).unwrap();
        assert_ne!(a, b);
        engine().close(a).unwrap();
        engine().close(b).unwrap();
        // A removed descriptor is a miss, not an alias.
        assert!(matches!(engine().close(a), Err(Error::ClosedSocket)));
    }

    #[test]
    fn bind_conflicts_and_connect_refusal() {
        let a = engine().create(Domain::Sp, Pattern::Pair).unwrap();
        let b = engine().create(Domain::Sp, Pattern::Pair).unwrap();
        engine().bind(a, "inproc://engine-bind-conflict").unwrap();
        assert!(matches!(
            engine().bind(b, "inproc://engine-bind-conflict"),
            Err(Error::AddrInUse(_))
        ));
        assert!(matches!(
            engine().connect(b, "inproc://engine-no-binder"),
            Err(Error::ConnectionRefused(_))
        ));
        engine().close(a).unwrap();
        engine().close(b).unwrap();
    }

    #[test]
    fn incompatible_patterns_cannot_link() {
        let pub_fd = engine().create(Domain::Sp, Pattern::Pub).unwrap();
        let pull_fd = engine().create(Domain::Sp, Pattern::Pull).unwrap();
        engine().bind(pub_fd, "inproc://engine-incompat").unwrap();
        assert!(matches!(
            engine().connect(pull_fd, "inproc://engine-incompat"),
            Err(Error::InvalidArgument(_))
        ));
        engine().close(pub_fd).unwrap();
        engine().close(pull_fd).unwrap();
    }

    #[test]
    fn pair_round_trip() {
        let a = engine().create(Domain::Sp, Pattern::Pair).unwrap();
        let b = engine().create(Domain::Sp, Pattern::Pair).unwrap();
        engine().bind(a, "inproc://engine-pair").unwrap();
        engine().connect(b, "inproc://engine-pair").unwrap();

        engine()
            .send(b, Bytes::from_static(b"hello"), Flags::NONE)
            .unwrap();
        let msg = engine().recv(a, Flags::NONE).unwrap();
        assert_eq!(&msg[..], b"hello");

        engine().close(a).unwrap();
        engine().close(b).unwrap();
    }

    #[test]
    fn dontwait_recv_on_empty_queue() {
        let a = engine().create(Domain::Sp, Pattern::Pull).unwrap();
        let err = engine().recv(a, Flags::DONTWAIT).unwrap_err();
        assert!(err.is_would_block());
        engine().close(a).unwrap();
    }

    #[test]
    fn directionality_is_enforced() {
        let push = engine().create(Domain::Sp, Pattern::Push).unwrap();
        let sub = engine().create(Domain::Sp, Pattern::Sub).unwrap();
        assert!(matches!(
            engine().recv(push, Flags::DONTWAIT),
            Err(Error::NotSupported)
        ));
        assert!(matches!(
            engine().send(sub, Bytes::new(), Flags::NONE),
            Err(Error::NotSupported)
        ));
        engine().close(push).unwrap();
        engine().close(sub).unwrap();
    }

    #[test]
    fn req_rep_alternation() {
        let req = engine().create(Domain::Sp, Pattern::Req).unwrap();
        let rep = engine().create(Domain::Sp, Pattern::Rep).unwrap();
        engine().bind(rep, "inproc://engine-reqrep").unwrap();
        engine().connect(req, "inproc://engine-reqrep").unwrap();

        // REQ cannot recv before sending; REP cannot send before receiving.
        assert!(matches!(
            engine().recv(req, Flags::DONTWAIT),
            Err(Error::BadState)
        ));
        assert!(matches!(
            engine().send(rep, Bytes::new(), Flags::NONE),
            Err(Error::BadState)
        ));

        engine()
            .send(req, Bytes::from_static(b"question"), Flags::NONE)
            .unwrap();
        // Second send without a reply in between is a state violation.
        assert!(matches!(
            engine().send(req, Bytes::new(), Flags::NONE),
            Err(Error::BadState)
        ));

        let q = engine().recv(rep, Flags::NONE).unwrap();
        assert_eq!(&q[..], b"question");
        engine()
            .send(rep, Bytes::from_static(b"answer"), Flags::NONE)
            .unwrap();
        let a = engine().recv(req, Flags::NONE).unwrap();
        assert_eq!(&a[..], b"answer");

        engine().close(req).unwrap();
        engine().close(rep).unwrap();
    }

    #[test]
    fn pub_sub_prefix_filtering() {
        let publisher = engine().create(Domain::Sp, Pattern::Pub).unwrap();
        let subscriber = engine().create(Domain::Sp, Pattern::Sub).unwrap();
        engine().bind(publisher, "inproc://engine-pubsub").unwrap();
        engine().connect(subscriber, "inproc://engine-pubsub").unwrap();

        // No subscription yet: everything is filtered out.
        engine()
            .send(publisher, Bytes::from_static(b"weather.paris"), Flags::NONE)
            .unwrap();
        assert!(engine().recv(subscriber, Flags::DONTWAIT).is_err());

        engine()
            .set_option(
                subscriber,
                Level::Pattern(Pattern::Sub),
                OptionName::Subscribe,
                OptionValue::Str("weather.".to_string()),
            )
            .unwrap();
        engine()
            .send(publisher, Bytes::from_static(b"weather.oslo"), Flags::NONE)
            .unwrap();
        engine()
            .send(publisher, Bytes::from_static(b"sports.foot"), Flags::NONE)
            .unwrap();
        let msg = engine().recv(subscriber, Flags::NONE).unwrap();
        assert_eq!(&msg[..], b"weather.oslo");
        assert!(engine().recv(subscriber, Flags::DONTWAIT).is_err());

        engine().close(publisher).unwrap();
        engine().close(subscriber).unwrap();
    }

    #[test]
    fn options_are_readable_through_the_engine() {
        let fd = engine().create(Domain::Sp, Pattern::Pair).unwrap();
        let v = engine()
            .get_option(fd, Level::Socket, OptionName::Linger)
            .unwrap();
        assert_eq!(v, OptionValue::Int(1000));
        engine().close(fd).unwrap();
    }

    #[test]
    fn pair_takes_at_most_one_peer() {
        let binder = engine().create(Domain::Sp, Pattern::Pair).unwrap();
        let first = engine().create(Domain::Sp, Pattern::Pair).unwrap();
        let second = engine().create(Domain::Sp, Pattern::Pair).unwrap();
        engine().bind(binder, "inproc://engine-pair-exclusive").unwrap();
        engine()
            .connect(first, "inproc://engine-pair-exclusive")
            .unwrap();
        assert!(matches!(
            engine().connect(second, "inproc://engine-pair-exclusive"),
            Err(Error::InvalidArgument(_))
        ));

        // All of the binder's traffic goes to its one linked peer.
        engine()
            .send(binder, Bytes::from_static(b"one"), Flags::NONE)
            .unwrap();
        engine()
            .send(binder, Bytes::from_static(b"two"), Flags::NONE)
            .unwrap();
        assert_eq!(&engine().recv(first, Flags::NONE).unwrap()[..], b"one");
        assert_eq!(&engine().recv(first, Flags::NONE).unwrap()[..], b"two");

        // Closing the peer frees the slot.
        engine().close(first).unwrap();
        engine()
            .connect(second, "inproc://engine-pair-exclusive")
            .unwrap();

        engine().close(binder).unwrap();
        engine().close(second).unwrap();
    }

    #[test]
    fn poll_writability_follows_request_reply_state() {
        let req = engine().create(Domain::Sp, Pattern::Req).unwrap();
        let rep = engine().create(Domain::Sp, Pattern::Rep).unwrap();
        engine().bind(rep, "inproc://engine-poll-exchange").unwrap();
        engine()
            .connect(req, "inproc://engine-poll-exchange")
            .unwrap();

        // Fresh link: only REQ may send.
        let mut fds = [
            PollDescriptor::new(req, Interest::WRITABLE),
            PollDescriptor::new(rep, Interest::WRITABLE),
        ];
        assert_eq!(engine().poll(&mut fds, 0).unwrap(), 1);
        assert!(fds[0].revents.contains(Interest::WRITABLE));
        assert!(fds[1].revents.is_empty());

        engine()
            .send(req, Bytes::from_static(b"q"), Flags::NONE)
            .unwrap();
        // Request in flight: neither side may send until REP receives it.
        let mut fds = [
            PollDescriptor::new(req, Interest::WRITABLE),
            PollDescriptor::new(rep, Interest::WRITABLE),
        ];
        assert_eq!(engine().poll(&mut fds, 0).unwrap(), 0);

        engine().recv(rep, Flags::NONE).unwrap();
        let mut fds = [PollDescriptor::new(rep, Interest::WRITABLE)];
        assert_eq!(engine().poll(&mut fds, 0).unwrap(), 1);

        engine().close(req).unwrap();
        engine().close(rep).unwrap();
    }

    #[test]
    fn shutdown_unlinks_one_endpoint() {
        let a = engine().create(Domain::Sp, Pattern::Pair).unwrap();
        let b = engine().create(Domain::Sp, Pattern::Pair).unwrap();
        engine().bind(a, "inproc://engine-shutdown").unwrap();
        let eid = engine().connect(b, "inproc://engine-shutdown").unwrap();
        engine().shutdown(b, eid).unwrap();
        // Unknown endpoint id is rejected.
        assert!(engine().shutdown(b, eid).is_err());
        // The link is gone: a non-blocking send finds no peer.
        assert!(engine()
            .send(b, Bytes::from_static(b"x"), Flags::DONTWAIT)
            .unwrap_err()
            .is_would_block());
        engine().close(a).unwrap();
        engine().close(b).unwrap();
    }

    #[test]
    fn oversize_messages_are_dropped_at_delivery() {
        let push = engine().create(Domain::Sp, Pattern::Push).unwrap();
        let pull = engine().create(Domain::Sp, Pattern::Pull).unwrap();
        engine().bind(pull, "inproc://engine-oversize").unwrap();
        engine().connect(push, "inproc://engine-oversize").unwrap();
        engine()
            .set_option(
                pull,
                Level::Socket,
                OptionName::RecvMaxSize,
                OptionValue::Int(4),
            )
            .unwrap();

        engine()
            .send(push, Bytes::from_static(b"way too big"), Flags::NONE)
            .unwrap();
        assert!(engine().recv(pull, Flags::DONTWAIT).is_err());

        engine()
            .send(push, Bytes::from_static(b"ok"), Flags::NONE)
            .unwrap();
        assert_eq!(&engine().recv(pull, Flags::NONE).unwrap()[..], b"ok");

        engine().close(push).unwrap();
        engine().close(pull).unwrap();
    }
}
