//! Identity of a unit of parallel work.
//!
//! Every per-worker structure in the crate is an explicit map keyed by
//! [`WorkerId`]. By default each OS thread receives a fresh id the first time
//! it asks for one; executors that multiplex many tasks over one thread bind
//! a task-specific id with [`WorkerId::scope`].

use std::cell::Cell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_WORKER: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_WORKER: WorkerId = WorkerId::allocate();
    static SCOPED_WORKER: Cell<Option<WorkerId>> = const { Cell::new(None) };
}

/// Process-unique identifier of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
pub struct WorkerId(u64);

impl WorkerId {
    /// Identity of the calling worker.
    ///
    /// ```
    /// use weft::WorkerId;
    /// assert_eq!(WorkerId::current(), WorkerId::current());
    /// let other = std::thread::spawn(WorkerId::current)
    ///     .join()
    ///     .unwrap_or_else(|_| panic!("thread panicked"));
    /// assert_ne!(other, WorkerId::current());
    /// ```
    #[must_use]
    pub fn current() -> Self {
        SCOPED_WORKER
            .with(Cell::get)
            .unwrap_or_else(|| THREAD_WORKER.with(|id| *id))
    }

    /// Allocate an id not used by any thread or earlier allocation.
    #[must_use]
    pub fn allocate() -> Self {
        Self(NEXT_WORKER.fetch_add(1, Ordering::Relaxed))
    }

    /// Run `work` with `self` as the calling worker's identity.
    ///
    /// Scopes nest; the previous identity is restored when `work` returns or
    /// unwinds.
    pub fn scope<R>(self, work: impl FnOnce() -> R) -> R {
        struct Restore(Option<WorkerId>);

        impl Drop for Restore {
            fn drop(&mut self) {
                SCOPED_WORKER.with(|slot| slot.set(self.0));
            }
        }

        let previous = SCOPED_WORKER.with(|slot| slot.replace(Some(self)));
        let _restore = Restore(previous);
        work()
    }

    /// Numeric value of the id.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for WorkerId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker-{}", self.0)
    }
}
