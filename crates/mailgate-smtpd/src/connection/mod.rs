//! Connection handling.
//!
//! A [`Connection`] owns everything one client needs (context, decoder,
//! read buffer) and runs the request/response loop over an [`SmtpStream`].
//! The only state shared between connections is the [`ConnectionCounter`]
//! used for admission control.

mod session;
mod stream;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub use session::Connection;
pub use stream::SmtpStream;

/// Number of live connections of a server.
#[derive(Debug, Default)]
pub struct ConnectionCounter {
    active: AtomicUsize,
}

impl ConnectionCounter {
    /// Creates a counter at zero.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            active: AtomicUsize::new(0),
        }
    }

    /// Returns the number of live connections.
    #[must_use]
    pub fn count(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    /// Counts a new connection until the returned guard is dropped.
    #[must_use]
    pub fn acquire(self: &Arc<Self>) -> ConnectionGuard {
        let count = self.active.fetch_add(1, Ordering::AcqRel) + 1;
        ConnectionGuard {
            counter: Arc::clone(self),
            count,
        }
    }
}

/// Keeps one connection counted.
#[derive(Debug)]
pub struct ConnectionGuard {
    counter: Arc<ConnectionCounter>,
    count: usize,
}

impl ConnectionGuard {
    /// Live connections when this one was accepted, itself included.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.counter.active.fetch_sub(1, Ordering::AcqRel);
    }
}
