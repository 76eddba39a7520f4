//! Per-worker page object cache.
//!
//! Each worker lazily builds at most one instance of every page type and
//! reuses it until the unit ends. Workers never observe each other's
//! instances.

mod factory;

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, LazyLock};

use dashmap::DashMap;
use thiserror::Error;
use tracing::{debug, trace};

use crate::context::ContextValue;
use crate::panic::panic_message;
use crate::worker::WorkerId;

pub use factory::{PageFactories, PageRegistration};

/// Marker for types that can be cached as page objects.
pub trait PageObject: Any + Send + Sync {}

impl<T: Any + Send + Sync> PageObject for T {}

/// Why a page object could not be built.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstructionError {
    /// Neither a registration nor a `page!` declaration exists for the type.
    #[error("no constructor is registered for page `{type_name}`")]
    NoConstructor {
        /// Page type.
        type_name: &'static str,
    },
    /// A fallible constructor returned an error.
    #[error("constructing page `{type_name}` failed: {message}")]
    Failed {
        /// Page type.
        type_name: &'static str,
        /// Constructor error message.
        message: String,
    },
    /// The constructor panicked.
    #[error("constructor of page `{type_name}` panicked: {message}")]
    Panicked {
        /// Page type.
        type_name: &'static str,
        /// Panic payload.
        message: String,
    },
    /// The constructor produced a value of a different type.
    #[error("constructor of page `{type_name}` returned another type")]
    TypeMismatch {
        /// Page type.
        type_name: &'static str,
    },
}

type WorkerPages = HashMap<TypeId, ContextValue>;

static GLOBAL: LazyLock<PageCache> = LazyLock::new(|| PageCache::new(PageFactories::global()));

/// Page instances keyed by worker, then by type.
///
/// ```
/// use weft::PageCache;
///
/// #[derive(Default)]
/// struct SearchPage;
///
/// let factories = weft::pages::PageFactories::new();
/// factories.register(SearchPage::default);
/// let cache = PageCache::new(std::sync::Arc::new(factories));
///
/// let first = cache.get::<SearchPage>().unwrap_or_else(|err| panic!("{err}"));
/// let second = cache.get::<SearchPage>().unwrap_or_else(|err| panic!("{err}"));
/// assert!(std::sync::Arc::ptr_eq(&first, &second));
/// ```
#[derive(Debug)]
pub struct PageCache {
    factories: Arc<PageFactories>,
    pages: DashMap<WorkerId, WorkerPages>,
}

impl PageCache {
    /// Cache shared by the runner and worker pool.
    #[must_use]
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    /// Create an empty cache drawing constructors from `factories`.
    #[must_use]
    pub fn new(factories: Arc<PageFactories>) -> Self {
        Self {
            factories,
            pages: DashMap::new(),
        }
    }

    /// Constructors used by this cache.
    #[must_use]
    pub fn factories(&self) -> &PageFactories {
        &self.factories
    }

    /// The calling worker's instance of `T`, built on first request.
    ///
    /// Construction runs without holding any cache lock, so constructors may
    /// request other pages.
    ///
    /// # Errors
    /// Returns [`ConstructionError`] when `T` has no constructor or the
    /// constructor fails or panics.
    pub fn get<T: PageObject>(&self) -> Result<Arc<T>, ConstructionError> {
        let worker = WorkerId::current();
        let type_id = TypeId::of::<T>();
        let type_name = std::any::type_name::<T>();
        if let Some(existing) = self.lookup(worker, type_id) {
            return downcast(existing, type_name);
        }

        let constructor = self.factories.constructor::<T>()?;
        let built = catch_unwind(AssertUnwindSafe(|| constructor())).map_err(|payload| {
            ConstructionError::Panicked {
                type_name,
                message: panic_message(payload.as_ref()),
            }
        })??;
        debug!(%worker, page = type_name, "constructed page object");

        let stored = {
            let mut entry = self.pages.entry(worker).or_default();
            Arc::clone(entry.entry(type_id).or_insert(built))
        };
        downcast(stored, type_name)
    }

    fn lookup(&self, worker: WorkerId, type_id: TypeId) -> Option<ContextValue> {
        self.pages
            .get(&worker)
            .and_then(|pages| pages.get(&type_id).map(Arc::clone))
    }

    /// Return `true` when the calling worker holds an instance of `T`.
    #[must_use]
    pub fn contains<T: PageObject>(&self) -> bool {
        self.lookup(WorkerId::current(), TypeId::of::<T>())
            .is_some()
    }

    /// Discard the calling worker's instance of `T`, if any.
    pub fn reset<T: PageObject>(&self) -> bool {
        let worker = WorkerId::current();
        self.pages
            .get_mut(&worker)
            .is_some_and(|mut pages| pages.remove(&TypeId::of::<T>()).is_some())
    }

    /// Discard every instance held by the calling worker.
    pub fn clear(&self) {
        let worker = WorkerId::current();
        if let Some((_, pages)) = self.pages.remove(&worker) {
            trace!(%worker, count = pages.len(), "cleared page objects");
        }
    }

    /// Discard every instance held by any worker.
    pub fn clear_all(&self) {
        self.pages.clear();
    }

    /// Number of instances held by the calling worker.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pages
            .get(&WorkerId::current())
            .map_or(0, |pages| pages.len())
    }

    /// Return `true` when the calling worker holds no instances.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PageCache {
    fn default() -> Self {
        Self::new(Arc::new(PageFactories::new()))
    }
}

fn downcast<T: PageObject>(
    value: ContextValue,
    type_name: &'static str,
) -> Result<Arc<T>, ConstructionError> {
    value
        .downcast::<T>()
        .map_err(|_| ConstructionError::TypeMismatch { type_name })
}
