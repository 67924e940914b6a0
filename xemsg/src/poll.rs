//! Readiness multiplexing over many heterogeneous sockets.

use smallvec::SmallVec;

use xemsg_core::engine::{engine, Interest, PollDescriptor};
use xemsg_core::error::Result;

use crate::socket::Socket;

/// One socket plus the readiness the caller is interested in.
///
/// After [`poll`] returns, [`PollEntry::revents`] holds the observed
/// readiness for this entry's socket, masked by the requested interest.
#[derive(Debug)]
pub struct PollEntry<'a> {
    socket: &'a Socket,
    interest: Interest,
    revents: Interest,
}

impl<'a> PollEntry<'a> {
    #[must_use]
    pub const fn new(socket: &'a Socket, interest: Interest) -> Self {
        Self {
            socket,
            interest,
            revents: Interest::NONE,
        }
    }

    #[must_use]
    pub fn socket(&self) -> &'a Socket {
        self.socket
    }

    #[must_use]
    pub const fn interest(&self) -> Interest {
        self.interest
    }

    /// Observed readiness from the most recent poll.
    #[must_use]
    pub const fn revents(&self) -> Interest {
        self.revents
    }

    #[must_use]
    pub const fn readable(&self) -> bool {
        self.revents.contains(Interest::READABLE)
    }

    #[must_use]
    pub const fn writable(&self) -> bool {
        self.revents.contains(Interest::WRITABLE)
    }
}

/// Wait until at least one entry's socket is ready, for up to `timeout_ms`.
///
/// Returns the number of ready entries; a timeout with nothing ready is the
/// distinguished `Ok(0)` outcome, never an error. Entries are reported in
/// input order, so callers can correlate by position.
///
/// Timeout semantics: `0` checks readiness and returns immediately, a
/// positive value blocks up to that many milliseconds, a negative value
/// blocks indefinitely. The call blocks the invoking thread; the only way
/// to cut it short is the timeout itself (or process-wide termination,
/// which fails the call).
///
/// An empty entry slice is a valid no-op: immediate `Ok(0)`, no transport
/// call.
pub fn poll(entries: &mut [PollEntry<'_>], timeout_ms: i32) -> Result<usize> {
    if entries.is_empty() {
        return Ok(0);
    }
    let mut fds: SmallVec<[PollDescriptor; 8]> = entries
        .iter()
        .map(|e| {
            e.socket
                .ensure_open()
                .map(|fd| PollDescriptor::new(fd, e.interest))
        })
        .collect::<Result<_>>()?;
    let ready = engine().poll(&mut fds, timeout_ms)?;
    for (entry, fd) in entries.iter_mut().zip(fds.iter()) {
        entry.revents = fd.revents;
    }
    Ok(ready)
}

#[cfg(test)]
mod tests {
    use super::*;
    use xemsg_core::error::Error;
    use xemsg_core::flags::Flags;
    use xemsg_core::pattern::{Domain, Pattern};

    #[test]
    fn empty_entry_list_is_a_no_op() {
        let mut entries: Vec<PollEntry<'_>> = Vec::new();
        assert_eq!(poll(&mut entries, -1).unwrap(), 0);
    }

    #[test]
    fn zero_timeout_with_nothing_ready() {
        let s = Socket::new(Domain::Sp, Pattern::Pull).unwrap();
        let mut entries = [PollEntry::new(&s, Interest::READABLE)];
        let start = std::time::Instant::now();
        assert_eq!(poll(&mut entries, 0).unwrap(), 0);
        assert!(start.elapsed() < std::time::Duration::from_secs(1));
        assert!(!entries[0].readable());
    }

    #[test]
    fn closed_socket_is_rejected_before_the_engine() {
        let mut s = Socket::new(Domain::Sp, Pattern::Pull).unwrap();
        s.close().unwrap();
        let mut entries = [PollEntry::new(&s, Interest::READABLE)];
        assert!(matches!(
            poll(&mut entries, 0),
            Err(Error::ClosedSocket)
        ));
    }

    #[test]
    fn readiness_is_reported_per_entry_in_input_order() {
        let pull_a = Socket::new(Domain::Sp, Pattern::Pull).unwrap();
        let pull_b = Socket::new(Domain::Sp, Pattern::Pull).unwrap();
        let push = Socket::new(Domain::Sp, Pattern::Push).unwrap();
        pull_a.bind("inproc://poll-order").unwrap();
        push.connect("inproc://poll-order").unwrap();
        push.send("wake", Flags::NONE).unwrap();

        let mut entries = [
            PollEntry::new(&pull_b, Interest::READABLE),
            PollEntry::new(&pull_a, Interest::READABLE),
        ];
        let ready = poll(&mut entries, 5000).unwrap();
        assert_eq!(ready, 1);
        assert!(!entries[0].readable());
        assert!(entries[1].readable());
    }

    #[test]
    fn writability_tracks_peer_capacity() {
        let push = Socket::new(Domain::Sp, Pattern::Push).unwrap();
        let pull = Socket::new(Domain::Sp, Pattern::Pull).unwrap();

        // No peer yet: not writable.
        let mut entries = [PollEntry::new(&push, Interest::WRITABLE)];
        assert_eq!(poll(&mut entries, 0).unwrap(), 0);

        pull.bind("inproc://poll-writable").unwrap();
        push.connect("inproc://poll-writable").unwrap();
        let mut entries = [PollEntry::new(&push, Interest::WRITABLE)];
        assert_eq!(poll(&mut entries, 1000).unwrap(), 1);
        assert!(entries[0].writable());
        assert!(!entries[0].readable());
    }
}
