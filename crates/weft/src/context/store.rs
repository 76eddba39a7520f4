//! Concurrent map from worker to context.

use std::sync::{Arc, LazyLock, Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;
use derive_more::Deref;
use tracing::{trace, warn};

use super::ExecutionContext;
use crate::worker::WorkerId;

type Slot = Arc<Mutex<ExecutionContext>>;

static GLOBAL: LazyLock<ContextStore> = LazyLock::new(ContextStore::new);

fn lock(slot: &Mutex<ExecutionContext>) -> MutexGuard<'_, ExecutionContext> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Store of one live [`ExecutionContext`] per worker.
///
/// The map doubles as the introspection index, so listing contexts can never
/// disagree with what workers see. Each context sits behind its own mutex,
/// held by the owning worker except while a snapshot is copied.
///
/// Handlers running inside [`with_current`](Self::with_current) already hold
/// their context; calling back into the same store from there for the same
/// worker blocks.
#[derive(Debug, Default)]
pub struct ContextStore {
    contexts: DashMap<WorkerId, Slot>,
}

impl ContextStore {
    /// Process-wide store used by the runner and worker pool.
    #[must_use]
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, worker: WorkerId) -> Slot {
        let entry = self.contexts.entry(worker).or_insert_with(|| {
            trace!(%worker, "creating execution context");
            Arc::new(Mutex::new(ExecutionContext::new(worker)))
        });
        Arc::clone(entry.value())
    }

    /// Run `f` with exclusive access to the calling worker's context,
    /// creating the context on first use.
    ///
    /// ```
    /// use weft::ContextStore;
    ///
    /// let store = ContextStore::new();
    /// store.with_current(|ctx| ctx.insert("user", String::from("alice")));
    /// let user = store.with_current(|ctx| ctx.get_str("user").map(str::to_owned));
    /// assert_eq!(user.as_deref(), Some("alice"));
    /// ```
    pub fn with_current<R>(&self, f: impl FnOnce(&mut ExecutionContext) -> R) -> R {
        let slot = self.slot(WorkerId::current());
        let mut guard = lock(&slot);
        f(&mut guard)
    }

    /// Run `f` on the calling worker's context only if it already exists.
    pub fn try_with_current<R>(&self, f: impl FnOnce(&mut ExecutionContext) -> R) -> Option<R> {
        let slot = self
            .contexts
            .get(&WorkerId::current())
            .map(|entry| Arc::clone(entry.value()))?;
        let mut guard = lock(&slot);
        Some(f(&mut guard))
    }

    /// Remove the calling worker's context.
    ///
    /// Returns whether a context existed; calling it again is harmless.
    pub fn clear(&self) -> bool {
        self.clear_worker(WorkerId::current())
    }

    fn clear_worker(&self, worker: WorkerId) -> bool {
        let removed = self.contexts.remove(&worker).is_some();
        if removed {
            trace!(%worker, "cleared execution context");
        }
        removed
    }

    /// Snapshot of `worker`'s context, if it has one.
    #[must_use]
    pub fn context_for(&self, worker: WorkerId) -> Option<ContextSnapshot> {
        let slot = self.contexts.get(&worker).map(|entry| Arc::clone(entry.value()))?;
        let snapshot = lock(&slot).clone();
        Some(ContextSnapshot(snapshot))
    }

    /// Snapshots of every live context, ordered by worker.
    #[must_use]
    pub fn all_contexts(&self) -> Vec<ContextSnapshot> {
        let slots: Vec<Slot> = self
            .contexts
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        let mut snapshots: Vec<_> = slots
            .iter()
            .map(|slot| ContextSnapshot(lock(slot).clone()))
            .collect();
        snapshots.sort_by_key(|snapshot| snapshot.worker());
        snapshots
    }

    /// Begin a unit on the calling worker.
    ///
    /// Any context left behind by an earlier unit that never cleaned up is
    /// discarded; the returned guard clears the context when dropped.
    #[must_use = "the context is cleared when the scope is dropped"]
    pub fn scope(&self) -> ContextScope<'_> {
        let worker = WorkerId::current();
        if self.clear_worker(worker) {
            warn!(%worker, "discarded orphaned execution context");
        }
        ContextScope { store: self, worker }
    }

    /// Drop every context.
    pub fn reset(&self) {
        self.contexts.clear();
    }

    /// Number of live contexts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    /// Return `true` when no worker holds a context.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

/// Read-only copy of another worker's context.
#[derive(Debug, Clone, Deref)]
pub struct ContextSnapshot(ExecutionContext);

impl ContextSnapshot {
    /// Unwrap the copied context.
    #[must_use]
    pub fn into_inner(self) -> ExecutionContext {
        self.0
    }
}

/// Guard that clears a worker's context when the unit ends.
#[derive(Debug)]
pub struct ContextScope<'a> {
    store: &'a ContextStore,
    worker: WorkerId,
}

impl ContextScope<'_> {
    /// Worker the scope belongs to.
    #[must_use]
    pub fn worker(&self) -> WorkerId {
        self.worker
    }
}

impl Drop for ContextScope<'_> {
    fn drop(&mut self) {
        self.store.clear_worker(self.worker);
    }
}
