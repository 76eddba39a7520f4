//! Page constructors resolved once per type.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::{Arc, LazyLock};

use dashmap::DashMap;
use tracing::debug;

use super::ConstructionError;
use crate::context::ContextValue;

type Constructor = Arc<dyn Fn() -> Result<ContextValue, ConstructionError> + Send + Sync>;

/// A page type declared with [`page!`](crate::page!).
#[derive(Debug)]
pub struct PageRegistration {
    /// Identity of the page type.
    pub type_id: fn() -> TypeId,
    /// Name of the page type.
    pub type_name: fn() -> &'static str,
    /// Builds a fresh instance.
    pub construct: fn() -> ContextValue,
}

inventory::collect!(PageRegistration);

/// Declare a page type constructed with its `Default` impl.
///
/// ```
/// #[derive(Default)]
/// struct LoginPage {
///     url: String,
/// }
///
/// weft::page!(LoginPage);
///
/// let page = weft::PageCache::global()
///     .get::<LoginPage>()
///     .unwrap_or_else(|err| panic!("{err}"));
/// assert!(page.url.is_empty());
/// ```
#[macro_export]
macro_rules! page {
    ($ty:ty) => {
        $crate::inventory::submit! {
            $crate::pages::PageRegistration {
                type_id: ::std::any::TypeId::of::<$ty>,
                type_name: ::std::any::type_name::<$ty>,
                construct: || {
                    ::std::sync::Arc::new(<$ty as ::std::default::Default>::default())
                        as $crate::context::ContextValue
                },
            }
        }
    };
}

static GLOBAL: LazyLock<Arc<PageFactories>> = LazyLock::new(|| Arc::new(PageFactories::new()));

/// Process-wide map from page type to constructor.
///
/// A type's constructor is looked up once, from explicit registrations
/// first and [`page!`](crate::page!) declarations second, then cached.
#[derive(Default)]
pub struct PageFactories {
    constructors: DashMap<TypeId, Constructor>,
}

impl PageFactories {
    /// Factories shared by [`PageCache::global`](super::PageCache::global).
    #[must_use]
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL)
    }

    /// Create an empty set of factories.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `build` as the constructor for `T`, replacing any other.
    pub fn register<T, F>(&self, build: F)
    where
        T: Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let constructor: Constructor = Arc::new(move || Ok(Arc::new(build()) as ContextValue));
        self.constructors.insert(TypeId::of::<T>(), constructor);
    }

    /// Register a constructor for `T` that may fail.
    pub fn register_fallible<T, E, F>(&self, build: F)
    where
        T: Any + Send + Sync,
        E: fmt::Display,
        F: Fn() -> Result<T, E> + Send + Sync + 'static,
    {
        let constructor: Constructor = Arc::new(move || {
            build()
                .map(|page| Arc::new(page) as ContextValue)
                .map_err(|err| ConstructionError::Failed {
                    type_name: std::any::type_name::<T>(),
                    message: err.to_string(),
                })
        });
        self.constructors.insert(TypeId::of::<T>(), constructor);
    }

    /// Return `true` when `T` has a constructor, resolving it if needed.
    #[must_use]
    pub fn has<T: Any>(&self) -> bool {
        self.constructor::<T>().is_ok()
    }

    pub(super) fn constructor<T: Any>(&self) -> Result<Constructor, ConstructionError> {
        let type_id = TypeId::of::<T>();
        if let Some(found) = self.constructors.get(&type_id) {
            return Ok(Arc::clone(found.value()));
        }
        let declared = inventory::iter::<PageRegistration>
            .into_iter()
            .find(|registration| (registration.type_id)() == type_id)
            .ok_or_else(|| ConstructionError::NoConstructor {
                type_name: std::any::type_name::<T>(),
            })?;
        let construct = declared.construct;
        let constructor: Constructor = Arc::new(move || Ok(construct()));
        debug!(page = (declared.type_name)(), "resolved page constructor");
        let entry = self.constructors.entry(type_id).or_insert(constructor);
        Ok(Arc::clone(entry.value()))
    }
}

impl fmt::Debug for PageFactories {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageFactories")
            .field("constructors", &self.constructors.len())
            .finish()
    }
}
