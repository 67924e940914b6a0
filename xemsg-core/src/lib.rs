//! xemsg Core
//!
//! Building blocks behind the `xemsg` socket API:
//! - Error taxonomy with transport errno mapping (`error`)
//! - Addressing domains and communication patterns (`pattern`)
//! - Endpoint address parsing (`endpoint`)
//! - Option descriptors and the per-socket option store (`options`)
//! - Send/receive modifier flags (`flags`)
//! - Enumerable constant symbol table (`symbols`)
//! - The in-process transport engine: descriptor table, inproc endpoint
//!   registry, message queues and readiness notification (`engine`)

#![deny(unsafe_code)]
#![allow(clippy::module_name_repetitions)]

pub mod endpoint;
pub mod engine;
pub mod error;
pub mod flags;
pub mod options;
pub mod pattern;
pub mod symbols;

// Small prelude for downstream crates; kept minimal to avoid API lock-in.
pub mod prelude {
    pub use crate::endpoint::Endpoint;
    pub use crate::engine::{engine, EndpointId, Fd, Interest, PollDescriptor};
    pub use crate::error::{Error, Result};
    pub use crate::flags::Flags;
    pub use crate::options::{Level, OptionName, OptionValue, ValueKind};
    pub use crate::pattern::{Domain, Pattern};
}
