//! # xemsg
//!
//! Message-oriented sockets implementing the classic scalability patterns
//! (pair, pub/sub, req/rep, push/pull, survey, bus) over pluggable
//! transports, with an in-process transport built in.
//!
//! ## Architecture
//!
//! - **`xemsg-core`**: error taxonomy, option tables, constant symbols and
//!   the in-process transport engine
//! - **`xemsg`**: the public socket surface (this crate) — the owning
//!   [`Socket`] handle, message I/O, [`poll`], [`BindTask`] and [`device`]
//!
//! The model is synchronous and thread-per-blocking-call: send, recv, poll
//! and bind run on the calling thread for their whole duration. The one
//! construct that spawns a thread of its own is [`BindTask`], which runs a
//! potentially slow bind in the background and hands the outcome back via
//! join / try-join.
//!
//! ## Quick Start
//!
//! ```rust
//! use xemsg::{Domain, Flags, Pattern, Socket};
//!
//! # fn example() -> xemsg::Result<()> {
//! let pull = Socket::new(Domain::Sp, Pattern::Pull)?;
//! let push = Socket::new(Domain::Sp, Pattern::Push)?;
//! pull.bind("inproc://quickstart")?;
//! push.connect("inproc://quickstart")?;
//!
//! push.send("ping", Flags::NONE)?;
//! let msg = pull.recv(Flags::NONE)?;
//! assert_eq!(&msg[..], b"ping");
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Waiting on many sockets
//!
//! ```rust,no_run
//! use xemsg::{poll, Interest, PollEntry, Domain, Pattern, Socket};
//!
//! # fn example() -> xemsg::Result<()> {
//! let a = Socket::new(Domain::Sp, Pattern::Pull)?;
//! let b = Socket::new(Domain::Sp, Pattern::Pull)?;
//! let mut entries = [
//!     PollEntry::new(&a, Interest::READABLE),
//!     PollEntry::new(&b, Interest::READABLE),
//! ];
//! // 0 ready entries after 100ms is a timeout, not an error.
//! let ready = poll(&mut entries, 100)?;
//! # let _ = ready;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

pub mod dev_tracing;
mod device;
mod poll;
mod socket;
mod task;

pub use device::device;
pub use poll::{poll, PollEntry};
pub use socket::{RecvIntoError, Socket};
pub use task::BindTask;

pub use xemsg_core::endpoint::Endpoint;
pub use xemsg_core::engine::{EndpointId, Interest};
pub use xemsg_core::error::{codes, Error, Result};
pub use xemsg_core::flags::Flags;
pub use xemsg_core::options::{Level, OptionName, OptionValue, ValueKind};
pub use xemsg_core::pattern::{Domain, Pattern};
pub use xemsg_core::symbols;

// Payloads are plain `bytes` buffers; re-export for user convenience.
pub use bytes::Bytes;

/// Process-wide shutdown of the transport subsystem.
///
/// Invalidates every outstanding socket and wakes all blocked calls, which
/// then fail with [`Error::Terminated`]. There is no re-initialization.
/// Calling this while other threads still hold live sockets is allowed but
/// makes every one of their operations fail from that point on.
pub fn term() {
    xemsg_core::engine::engine().term();
}
