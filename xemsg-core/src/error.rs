//! Error types for xemsg operations.
//!
//! Every failure that crosses a module boundary is an [`Error`]: the variant
//! is the kind, `Display` is the human-readable description, and [`Error::code`]
//! is the numeric errno the transport layer reports (nanomsg-compatible
//! values, including the `NN_HAUSNUMERO`-based `ETERM` and `EFSM`). No
//! component inspects raw negative results directly; the engine converts them
//! here and callers see `Result<T>`.

use std::io;
use thiserror::Error;

/// Numeric error codes as reported by the transport layer.
///
/// Values mirror nanomsg: POSIX errno numbers where one exists, and
/// `NN_HAUSNUMERO`-offset codes for conditions POSIX has no name for.
pub mod codes {
    /// Base for transport-private error codes.
    pub const HAUSNUMERO: i32 = 156_384_712;

    pub const EIO: i32 = 5;
    pub const EBADF: i32 = 9;
    pub const EAGAIN: i32 = 11;
    pub const EINVAL: i32 = 22;
    pub const EMSGSIZE: i32 = 90;
    pub const EPROTONOSUPPORT: i32 = 93;
    pub const ENOTSUP: i32 = 95;
    pub const EADDRINUSE: i32 = 98;
    pub const ETIMEDOUT: i32 = 110;
    pub const ECONNREFUSED: i32 = 111;
    /// The transport subsystem is shutting down.
    pub const ETERM: i32 = HAUSNUMERO + 53;
    /// Operation not allowed in the socket's current pattern state.
    pub const EFSM: i32 = HAUSNUMERO + 54;
}

/// Main error type for xemsg operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Non-blocking operation had nothing to do right now.
    #[error("operation would block")]
    WouldBlock,

    /// A send/receive timeout option elapsed before the operation completed.
    #[error("operation timed out")]
    TimedOut,

    /// Endpoint name already has a binder.
    #[error("address already in use: {0}")]
    AddrInUse(String),

    /// No binder registered for the endpoint.
    #[error("connection refused: {0}")]
    ConnectionRefused(String),

    /// Argument rejected locally, before any transport state was touched.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Endpoint string did not parse as any known address form.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Endpoint parsed but its transport is not compiled in.
    #[error("transport not supported: {0}")]
    TransportNotSupported(String),

    /// Operation is not defined for this socket pattern.
    #[error("operation not supported by this socket pattern")]
    NotSupported,

    /// Operation used a handle whose descriptor was already closed.
    #[error("use of closed socket")]
    ClosedSocket,

    /// Message exceeds the receiver's maximum message size.
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// Pattern state machine violation (e.g. REQ sending twice in a row).
    #[error("operation cannot be performed in the socket's current state")]
    BadState,

    /// The transport subsystem was terminated with `term()`.
    #[error("transport subsystem terminated")]
    Terminated,

    /// The bind task's outcome was already retrieved.
    #[error("bind task already joined")]
    AlreadyJoined,

    /// OS-level failure (e.g. spawning the bind worker thread).
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias for xemsg operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Numeric errno for this failure, as the transport would report it.
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Self::WouldBlock => codes::EAGAIN,
            Self::TimedOut => codes::ETIMEDOUT,
            Self::AddrInUse(_) => codes::EADDRINUSE,
            Self::ConnectionRefused(_) => codes::ECONNREFUSED,
            Self::InvalidArgument(_) | Self::InvalidEndpoint(_) | Self::AlreadyJoined => {
                codes::EINVAL
            }
            Self::TransportNotSupported(_) => codes::EPROTONOSUPPORT,
            Self::NotSupported => codes::ENOTSUP,
            Self::ClosedSocket => codes::EBADF,
            Self::MessageTooLarge { .. } => codes::EMSGSIZE,
            Self::BadState => codes::EFSM,
            Self::Terminated => codes::ETERM,
            Self::Io(e) => e.raw_os_error().unwrap_or(codes::EIO),
        }
    }

    /// Reconstruct the representative variant for a raw transport errno.
    ///
    /// Detail strings are unavailable at this point, so variants that carry
    /// one come back with an empty detail. Returns `None` for codes outside
    /// the enumerated set.
    #[must_use]
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            codes::EAGAIN => Some(Self::WouldBlock),
            codes::ETIMEDOUT => Some(Self::TimedOut),
            codes::EADDRINUSE => Some(Self::AddrInUse(String::new())),
            codes::ECONNREFUSED => Some(Self::ConnectionRefused(String::new())),
            codes::EINVAL => Some(Self::InvalidArgument(String::new())),
            codes::EPROTONOSUPPORT => Some(Self::TransportNotSupported(String::new())),
            codes::ENOTSUP => Some(Self::NotSupported),
            codes::EBADF => Some(Self::ClosedSocket),
            codes::EMSGSIZE => Some(Self::MessageTooLarge { size: 0, max: 0 }),
            codes::EFSM => Some(Self::BadState),
            codes::ETERM => Some(Self::Terminated),
            codes::EIO => Some(Self::Io(io::Error::from_raw_os_error(codes::EIO))),
            _ => None,
        }
    }

    /// True for the routine non-blocking "nothing to do right now" condition.
    ///
    /// Callers are expected to retry or back off rather than treat this as a
    /// hard failure.
    #[must_use]
    pub const fn is_would_block(&self) -> bool {
        matches!(self, Self::WouldBlock)
    }

    /// True when a configured send/receive timeout elapsed.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut)
    }

    /// True when retrying the same call cannot succeed.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        !matches!(self, Self::WouldBlock | Self::TimedOut)
    }
}
