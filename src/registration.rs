//! Bean registration types.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::error::{TargetError, TargetResult};
use crate::lifetime::Lifetime;
use crate::provider::BeanFactory;

/// Type-erased instance as stored in bean registries and scope stores.
///
/// Every instance is an `Arc<T>` boxed once more so unsized targets
/// (`Arc<dyn Trait>`) can be stored and recovered the same way.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

pub(crate) type Ctor = Arc<dyn Fn(&BeanFactory) -> TargetResult<AnyArc> + Send + Sync>;

/// Erases an `Arc<T>` into an [`AnyArc`].
pub(crate) fn erase<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> AnyArc {
    Arc::new(value)
}

/// Recovers the `Arc<T>` stored by [`erase`].
pub(crate) fn unerase<T: ?Sized + Send + Sync + 'static>(
    name: &str,
    value: &AnyArc,
) -> TargetResult<Arc<T>> {
    value
        .downcast_ref::<Arc<T>>()
        .cloned()
        .ok_or_else(|| TargetError::TypeMismatch {
            name: name.to_string(),
            expected: std::any::type_name::<T>(),
        })
}

/// Bean registration with lifetime and constructor
pub(crate) struct Registration {
    pub(crate) lifetime: Lifetime,
    pub(crate) ctor: Ctor,
    /// Type name of the registered bean, for diagnostics
    pub(crate) type_name: &'static str,
    /// Singleton cache, filled on first lookup
    pub(crate) single_runtime: Option<OnceLock<AnyArc>>,
}

impl Registration {
    pub(crate) fn new(lifetime: Lifetime, ctor: Ctor, type_name: &'static str) -> Self {
        let single_runtime = match lifetime {
            Lifetime::Singleton => Some(OnceLock::new()),
            Lifetime::Prototype => None,
        };

        Self {
            lifetime,
            ctor,
            type_name,
            single_runtime,
        }
    }
}

/// Bean registry keyed by bean name
#[derive(Default)]
pub(crate) struct Registry {
    pub(crate) beans: HashMap<String, Registration>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            beans: HashMap::new(),
        }
    }

    /// Inserts a registration, replacing any previous one with the same name.
    pub(crate) fn insert(&mut self, name: String, registration: Registration) -> Option<Registration> {
        self.beans.insert(name, registration)
    }

    #[inline]
    pub(crate) fn get(&self, name: &str) -> Option<&Registration> {
        self.beans.get(name)
    }

    #[inline]
    pub(crate) fn contains(&self, name: &str) -> bool {
        self.beans.contains_key(name)
    }

    pub(crate) fn names(&self) -> impl Iterator<Item = &str> {
        self.beans.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Shape: Send + Sync {
        fn sides(&self) -> u32;
    }

    struct Square;
    impl Shape for Square {
        fn sides(&self) -> u32 {
            4
        }
    }

    #[test]
    fn test_erase_roundtrip_for_trait_objects() {
        let shape: Arc<dyn Shape> = Arc::new(Square);
        let erased = erase(shape.clone());
        let back = unerase::<dyn Shape>("shape", &erased).unwrap();
        assert!(Arc::ptr_eq(&shape, &back));
        assert_eq!(back.sides(), 4);
    }

    #[test]
    fn test_unerase_wrong_type_is_mismatch() {
        let erased = erase(Arc::new(5u32));
        match unerase::<String>("number", &erased) {
            Err(TargetError::TypeMismatch { name, expected }) => {
                assert_eq!(name, "number");
                assert_eq!(expected, std::any::type_name::<String>());
            }
            other => panic!("expected type mismatch, got {:?}", other.map(|_| ())),
        }
    }
}
