//! Background bind execution with join / try-join semantics.
//!
//! Binding can itself block inside the transport (resolving and reserving a
//! listening resource), so [`BindTask`] runs the bind call on a dedicated
//! worker thread and hands the outcome back through a one-shot result cell:
//! written once by the worker, read once by the joiner.

use std::sync::Arc;
use std::thread;

use parking_lot::{Condvar, Mutex};
use tracing::debug;

use xemsg_core::engine::{engine, EndpointId};
use xemsg_core::error::{Error, Result};

use crate::socket::Socket;

/// One-shot handoff cell between the worker and the joiner.
struct Shared {
    outcome: Mutex<Option<Result<EndpointId>>>,
    cond: Condvar,
}

/// A bind call running on a background thread.
///
/// State machine: `Running` until the worker finishes, then joinable
/// exactly once via [`join`](Self::join) or [`try_join`](Self::try_join);
/// retrieving the outcome a second time is an error. The task borrows the
/// socket only long enough to capture its descriptor — the handle stays
/// with the caller, which can keep polling other sockets meanwhile.
///
/// Dropping a task that was never joined detaches the worker thread; the
/// bind still happens, but its outcome is lost.
pub struct BindTask {
    shared: Arc<Shared>,
    worker: Option<thread::JoinHandle<()>>,
    joined: bool,
}

impl BindTask {
    /// Start binding `socket` to `addr` on a background thread and return
    /// immediately. Ownership of the address string moves to the worker.
    pub fn spawn(socket: &Socket, addr: impl Into<String>) -> Result<Self> {
        let fd = socket.ensure_open()?;
        let addr = addr.into();
        let shared = Arc::new(Shared {
            outcome: Mutex::new(None),
            cond: Condvar::new(),
        });
        let cell = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name(format!("xemsg-bind-{fd}"))
            .spawn(move || {
                debug!("[BIND-TASK] fd={} binding {}", fd, addr);
                let outcome = engine().bind(fd, &addr);
                *cell.outcome.lock() = Some(outcome);
                cell.cond.notify_all();
            })?;
        Ok(Self {
            shared,
            worker: Some(worker),
            joined: false,
        })
    }

    /// Block until the bind completes, then return its outcome.
    ///
    /// Transitions the task to joined; a second join fails with
    /// [`Error::AlreadyJoined`].
    pub fn join(&mut self) -> Result<EndpointId> {
        if self.joined {
            return Err(Error::AlreadyJoined);
        }
        let outcome = {
            let mut slot = self.shared.outcome.lock();
            while slot.is_none() {
                self.shared.cond.wait(&mut slot);
            }
            slot.take().expect("outcome present")
        };
        self.finish();
        outcome
    }

    /// Non-blocking variant of [`join`](Self::join): `Ok(None)` while the
    /// bind is still running (without consuming the task), otherwise the
    /// same outcome `join` would return.
    pub fn try_join(&mut self) -> Result<Option<EndpointId>> {
        if self.joined {
            return Err(Error::AlreadyJoined);
        }
        let outcome = self.shared.outcome.lock().take();
        let Some(outcome) = outcome else {
            return Ok(None);
        };
        self.finish();
        outcome.map(Some)
    }

    /// Whether the outcome has already been retrieved.
    #[must_use]
    pub fn is_joined(&self) -> bool {
        self.joined
    }

    fn finish(&mut self) {
        self.joined = true;
        // The worker has already written the outcome; reaping it cannot
        // block for long.
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
