//! Message-forwarding bridge between two sockets.

use std::convert::Infallible;

use tracing::{debug, trace};

use xemsg_core::engine::Interest;
use xemsg_core::error::{Error, Result};
use xemsg_core::flags::Flags;

use crate::poll::{poll, PollEntry};
use crate::socket::Socket;

/// Bridge two sockets, forwarding messages between them until an error.
///
/// With `b = None` the single socket is looped back to itself: every
/// message received is sent back out of the same socket.
///
/// This call blocks for the remaining lifetime of the bridge and only ever
/// returns an error — callers that need to keep servicing other sockets
/// must run it on a dedicated thread. The sockets are borrowed for the
/// whole call, so they cannot be closed out from under the bridge; only a
/// transport failure or process-wide termination ends it.
pub fn device(a: &Socket, b: Option<&Socket>) -> Result<Infallible> {
    match b {
        Some(b) => bridge(a, b),
        None => loopback(a),
    }
}

fn loopback(s: &Socket) -> Result<Infallible> {
    if !(s.pattern().can_send() && s.pattern().can_recv()) {
        return Err(Error::InvalidArgument(format!(
            "{} socket cannot be looped back",
            s.pattern()
        )));
    }
    debug!("[DEVICE] loopback on fd={}", s.raw_descriptor());
    loop {
        let msg = s.recv(Flags::NONE)?;
        trace!("[DEVICE] looping {} bytes", msg.len());
        s.send(msg, Flags::NONE)?;
    }
}

fn bridge(a: &Socket, b: &Socket) -> Result<Infallible> {
    // Forward each direction the patterns permit; at least one must exist.
    let a_to_b = a.pattern().can_recv() && b.pattern().can_send();
    let b_to_a = b.pattern().can_recv() && a.pattern().can_send();
    if !a_to_b && !b_to_a {
        return Err(Error::InvalidArgument(format!(
            "no forwardable direction between {} and {}",
            a.pattern(),
            b.pattern()
        )));
    }
    debug!(
        "[DEVICE] bridging fd={} <-> fd={}",
        a.raw_descriptor(),
        b.raw_descriptor()
    );
    loop {
        let ia = if a_to_b { Interest::READABLE } else { Interest::NONE };
        let ib = if b_to_a { Interest::READABLE } else { Interest::NONE };
        let mut entries = [PollEntry::new(a, ia), PollEntry::new(b, ib)];
        poll(&mut entries, -1)?;
        if entries[0].readable() {
            forward(a, b)?;
        }
        if entries[1].readable() {
            forward(b, a)?;
        }
    }
}

fn forward(from: &Socket, to: &Socket) -> Result<()> {
    // Readiness can evaporate between poll and recv; just go round again.
    match from.recv(Flags::DONTWAIT) {
        Ok(msg) => {
            trace!(
                "[DEVICE] forwarding {} bytes fd={} -> fd={}",
                msg.len(),
                from.raw_descriptor(),
                to.raw_descriptor()
            );
            to.send(msg, Flags::NONE)?;
            Ok(())
        }
        Err(err) if err.is_would_block() => Ok(()),
        Err(err) => Err(err),
    }
}
