//! Bean factory module.
//!
//! This module contains the [`BeanFactory`] type used to look up named
//! beans registered in a [`BeanCollection`](crate::BeanCollection).

use std::sync::Arc;

use crate::error::{TargetError, TargetResult};
use crate::lifetime::Lifetime;
use crate::registration::{unerase, AnyArc, Registration, Registry};

/// Container of named beans.
///
/// The `BeanFactory` is the "child container" that refreshable and scoped
/// target sources fetch prototypes from. Singletons are created once and
/// cached; prototypes run their factory on every lookup.
///
/// # Thread Safety
///
/// `BeanFactory` is cheap to clone (it uses `Arc` internally) and can be
/// shared across threads. Singleton creation races are resolved by a
/// `OnceLock`: all callers observe the same instance.
///
/// # Examples
///
/// ```
/// use ferrous_target::BeanCollection;
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct Repository { db: Arc<Database> }
///
/// let mut beans = BeanCollection::new();
/// beans.add_singleton("db", Database { url: "postgres://localhost".to_string() });
/// beans.add_prototype("repo", |f| Repository {
///     db: f.get_bean::<Database>("db").unwrap(),
/// });
///
/// let factory = beans.build();
/// let repo = factory.get_bean::<Repository>("repo").unwrap();
/// assert_eq!(repo.db.url, "postgres://localhost");
/// ```
#[derive(Clone)]
pub struct BeanFactory {
    inner: Arc<FactoryInner>,
}

struct FactoryInner {
    registry: Registry,
}

impl BeanFactory {
    pub(crate) fn from_registry(registry: Registry) -> Self {
        Self {
            inner: Arc::new(FactoryInner { registry }),
        }
    }

    /// Looks up a bean by name.
    ///
    /// # Errors
    ///
    /// - [`TargetError::NotFound`] if no bean has this name
    /// - [`TargetError::TypeMismatch`] if the bean is not an `Arc<T>`
    /// - whatever a fallible prototype factory returns
    pub fn get_bean<T: ?Sized + Send + Sync + 'static>(&self, name: &str) -> TargetResult<Arc<T>> {
        let value = self.get_any(name)?;
        unerase::<T>(name, &value)
    }

    /// Looks up a bean without downcasting it.
    pub fn get_any(&self, name: &str) -> TargetResult<AnyArc> {
        let registration = self
            .inner
            .registry
            .get(name)
            .ok_or_else(|| TargetError::NotFound(name.to_string()))?;
        self.instantiate(name, registration)
    }

    fn instantiate(&self, name: &str, registration: &Registration) -> TargetResult<AnyArc> {
        match (&registration.lifetime, &registration.single_runtime) {
            (Lifetime::Singleton, Some(cell)) => {
                if let Some(value) = cell.get() {
                    return Ok(value.clone());
                }
                // Build outside the cell so factory errors are not cached.
                let value = (registration.ctor)(self)?;
                Ok(cell.get_or_init(|| value).clone())
            }
            _ => {
                tracing::trace!(bean = name, type_name = registration.type_name, "creating prototype");
                (registration.ctor)(self)
            }
        }
    }

    pub fn contains_bean(&self, name: &str) -> bool {
        self.inner.registry.contains(name)
    }

    /// Lifetime of the named bean, or `None` if it is not registered.
    pub fn lifetime(&self, name: &str) -> Option<Lifetime> {
        self.inner.registry.get(name).map(|r| r.lifetime)
    }

    pub fn is_prototype(&self, name: &str) -> bool {
        self.lifetime(name).is_some_and(Lifetime::is_prototype)
    }

    /// Registered type name of a bean, for diagnostics.
    pub fn type_name(&self, name: &str) -> Option<&'static str> {
        self.inner.registry.get(name).map(|r| r.type_name)
    }

    /// All bean names, sorted.
    pub fn bean_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.registry.names().map(str::to_string).collect();
        names.sort();
        names
    }

    pub fn ptr_eq(&self, other: &BeanFactory) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl std::fmt::Debug for BeanFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BeanFactory")
            .field("beans", &self.bean_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BeanCollection;
    use std::sync::atomic::{AtomicU32, Ordering};

    trait Greeter: Send + Sync {
        fn greet(&self) -> String;
    }

    struct English;
    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".to_string()
        }
    }

    #[test]
    fn test_singleton_factory_runs_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let mut beans = BeanCollection::new();
        beans.add_singleton_factory("s", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            7u64
        });
        let factory = beans.build();

        let a = factory.get_bean::<u64>("s").unwrap();
        let b = factory.get_bean::<u64>("s").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_trait_prototype_lookup() {
        let mut beans = BeanCollection::new();
        beans.add_prototype_trait::<dyn Greeter, _>("greeter", |_| Arc::new(English));
        let factory = beans.build();

        let g = factory.get_bean::<dyn Greeter>("greeter").unwrap();
        assert_eq!(g.greet(), "hello");
        assert_eq!(factory.type_name("greeter"), Some(std::any::type_name::<dyn Greeter>()));
    }

    #[test]
    fn test_missing_bean_is_not_found() {
        let factory = BeanCollection::new().build();
        assert!(matches!(factory.get_bean::<u8>("nope"), Err(TargetError::NotFound(n)) if n == "nope"));
        assert_eq!(factory.lifetime("nope"), None);
        assert!(!factory.is_prototype("nope"));
    }

    #[test]
    fn test_failing_prototype_propagates() {
        let mut beans = BeanCollection::new();
        beans.add_prototype_factory::<String, _>("broken", |_| {
            Err(TargetError::load("broken", "disk on fire"))
        });
        let factory = beans.build();
        let err = factory.get_bean::<String>("broken").unwrap_err();
        assert!(err.is_load_failure());
        assert!(err.to_string().contains("disk on fire"));
    }

    #[test]
    fn test_bean_names_sorted() {
        let mut beans = BeanCollection::new();
        beans.add_singleton("b", 1u8);
        beans.add_singleton("a", 2u8);
        let factory = beans.build();
        assert_eq!(factory.bean_names(), vec!["a".to_string(), "b".to_string()]);
        assert!(factory.ptr_eq(&factory.clone()));
    }
}
