//! The owning socket handle and its message I/O operations.

use bytes::Bytes;
use tracing::trace;

use xemsg_core::engine::{engine, EndpointId, Fd};
use xemsg_core::error::{Error, Result};
use xemsg_core::flags::Flags;
use xemsg_core::options::{Level, OptionName, OptionValue};
use xemsg_core::pattern::{Domain, Pattern};

/// Sentinel descriptor value of a closed handle.
const CLOSED_FD: Fd = -1;

/// An owning handle to a transport socket.
///
/// The handle is the exclusive owner of its descriptor: it is not `Clone`,
/// and lending it to `poll` or a [`crate::BindTask`] is a borrow, not a
/// transfer. Closing is irreversible and idempotent; after `close` the
/// handle holds a sentinel descriptor and every operation fails locally
/// with [`Error::ClosedSocket`] before reaching the transport. Dropping an
/// open handle closes the descriptor.
///
/// A handle is not safe for overlapping send/recv/close from multiple
/// threads; the borrow rules enforce exactly that (`close` takes `&mut
/// self`).
#[derive(Debug)]
pub struct Socket {
    fd: Fd,
    domain: Domain,
    pattern: Pattern,
}

impl Socket {
    /// Create a socket for the given domain and communication pattern.
    pub fn new(domain: Domain, pattern: Pattern) -> Result<Self> {
        let fd = engine().create(domain, pattern)?;
        Ok(Self { fd, domain, pattern })
    }

    pub(crate) fn ensure_open(&self) -> Result<Fd> {
        if self.fd == CLOSED_FD {
            return Err(Error::ClosedSocket);
        }
        Ok(self.fd)
    }

    /// The raw integer descriptor, for lower layers. [`CLOSED_FD`]-valued
    /// (negative) once the handle is closed.
    #[must_use]
    pub fn raw_descriptor(&self) -> Fd {
        self.fd
    }

    #[must_use]
    pub fn domain(&self) -> Domain {
        self.domain
    }

    #[must_use]
    pub fn pattern(&self) -> Pattern {
        self.pattern
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.fd == CLOSED_FD
    }

    /// Register a listening endpoint at `addr` (e.g. `inproc://name`).
    ///
    /// The address string is opaque to this layer; malformed or unsupported
    /// addresses surface as transport errors. Binding can block inside the
    /// transport; see [`crate::BindTask`] for the asynchronous form.
    pub fn bind(&self, addr: &str) -> Result<EndpointId> {
        let fd = self.ensure_open()?;
        engine().bind(fd, addr)
    }

    /// Connect to a bound endpoint at `addr`.
    pub fn connect(&self, addr: &str) -> Result<EndpointId> {
        let fd = self.ensure_open()?;
        engine().connect(fd, addr)
    }

    /// Tear down one previously created endpoint without closing the socket.
    pub fn shutdown(&self, endpoint: EndpointId) -> Result<()> {
        let fd = self.ensure_open()?;
        engine().shutdown(fd, endpoint)
    }

    /// Release the descriptor. Idempotent: closing an already-closed handle
    /// is a no-op. The sentinel is set before the transport call completes,
    /// so no later operation can reach the transport through this handle.
    pub fn close(&mut self) -> Result<()> {
        if self.fd == CLOSED_FD {
            return Ok(());
        }
        let fd = std::mem::replace(&mut self.fd, CLOSED_FD);
        engine().close(fd)
    }

    // -----------------------------------------------------------------
    // Options
    // -----------------------------------------------------------------

    /// Read a socket or pattern-level option.
    ///
    /// The returned representation is fixed by the option's name: the
    /// socket-name option yields a string, every other readable option a
    /// 4-byte integer. String lengths are whatever the transport reports
    /// at query time.
    pub fn get_option(&self, level: Level, name: OptionName) -> Result<OptionValue> {
        let fd = self.ensure_open()?;
        engine().get_option(fd, level, name)
    }

    /// Write a socket or pattern-level option.
    ///
    /// The representation is taken from the supplied value (`i32` or
    /// string); an option that cannot accept that representation is
    /// rejected as an invalid argument before any state changes.
    pub fn set_option(
        &self,
        level: Level,
        name: OptionName,
        value: impl Into<OptionValue>,
    ) -> Result<()> {
        let fd = self.ensure_open()?;
        engine().set_option(fd, level, name, value.into())
    }

    // -----------------------------------------------------------------
    // Message I/O
    // -----------------------------------------------------------------

    /// Transmit a message; returns the number of payload bytes accepted.
    ///
    /// With [`Flags::DONTWAIT`], a full outbound queue fails with a
    /// would-block error instead of waiting. Otherwise the call blocks up
    /// to the send-timeout option (default: indefinitely).
    pub fn send(&self, msg: impl Into<Bytes>, flags: Flags) -> Result<usize> {
        let fd = self.ensure_open()?;
        engine().send(fd, msg.into(), flags)
    }

    /// Receive a message into a transport-allocated, exactly-sized buffer.
    ///
    /// Blocks until a message arrives, the receive-timeout option elapses,
    /// or the transport is torn down under the call; [`Flags::DONTWAIT`]
    /// turns an empty queue into a would-block error instead. The returned
    /// buffer is released when dropped, so no failure path can leak it.
    ///
    /// Historical always-allocate call shapes alias to this mode; there is
    /// no separate behavior to pick.
    pub fn recv(&self, flags: Flags) -> Result<Bytes> {
        let fd = self.ensure_open()?;
        engine().recv(fd, flags)
    }

    /// Receive a message into a caller-supplied buffer of fixed capacity.
    ///
    /// On success returns the number of bytes written, capped at
    /// `buf.len()`; a longer message is truncated and the excess discarded.
    /// On failure the error reports how many bytes were already captured in
    /// `buf` before the failure — partial data is never silently dropped.
    pub fn recv_into(&self, buf: &mut [u8], flags: Flags) -> Result<usize, RecvIntoError> {
        let fd = self.ensure_open().map_err(RecvIntoError::clean)?;
        let msg = engine().recv(fd, flags).map_err(RecvIntoError::clean)?;
        let n = msg.len().min(buf.len());
        buf[..n].copy_from_slice(&msg[..n]);
        if n < msg.len() {
            trace!(
                "[SOCKET] fd={} truncated {}-byte message to {}",
                fd,
                msg.len(),
                n
            );
        }
        Ok(n)
    }
}

impl Drop for Socket {
    fn drop(&mut self) {
        if self.fd != CLOSED_FD {
            // Deterministic finalization; the descriptor must not leak.
            let _ = engine().close(self.fd);
        }
    }
}

/// Failure of a fixed-capacity receive.
///
/// `written` is the number of bytes captured in the caller's buffer before
/// the operation failed; diagnostic tooling may still inspect
/// `buf[..written]`.
#[derive(Debug, thiserror::Error)]
#[error("receive failed after {written} bytes: {error}")]
pub struct RecvIntoError {
    pub written: usize,
    #[source]
    pub error: Error,
}

impl RecvIntoError {
    /// A failure before anything was written into the caller's buffer.
    fn clean(error: Error) -> Self {
        Self { written: 0, error }
    }
}
