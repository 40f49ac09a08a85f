//! Bean collection module.
//!
//! This module contains the [`BeanCollection`] type used to register named
//! beans before building a [`BeanFactory`].

use std::sync::Arc;

use crate::error::TargetResult;
use crate::lifetime::Lifetime;
use crate::provider::BeanFactory;
use crate::registration::{erase, AnyArc, Registration, Registry};

/// Registry of named bean definitions.
///
/// Beans are registered either as singletons (one shared instance) or as
/// prototypes (a factory closure run on every lookup). Refreshable and
/// scoped target sources re-fetch prototypes by name.
pub struct BeanCollection {
    registry: Registry,
}

impl BeanCollection {
    /// Creates a new empty bean collection.
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
        }
    }

    // ----- Singletons -----

    /// Registers a singleton instance under `name`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use ferrous_target::BeanCollection;
    /// struct Config {
    ///     database_url: String,
    /// }
    ///
    /// let mut beans = BeanCollection::new();
    /// beans.add_singleton("config", Config {
    ///     database_url: "postgres://localhost".to_string(),
    /// });
    /// let factory = beans.build();
    /// assert!(factory.contains_bean("config"));
    /// ```
    pub fn add_singleton<T: Send + Sync + 'static>(
        &mut self,
        name: impl Into<String>,
        value: T,
    ) -> &mut Self {
        self.add_singleton_trait(name, Arc::new(value))
    }

    /// Registers a shared instance, typically a trait object, under `name`.
    pub fn add_singleton_trait<T: ?Sized + Send + Sync + 'static>(
        &mut self,
        name: impl Into<String>,
        value: Arc<T>,
    ) -> &mut Self {
        let erased = erase(value);
        let ctor = move |_: &BeanFactory| -> TargetResult<AnyArc> { Ok(erased.clone()) };
        self.insert(name.into(), Lifetime::Singleton, Arc::new(ctor), std::any::type_name::<T>());
        self
    }

    /// Registers a singleton built lazily on first lookup.
    pub fn add_singleton_factory<T, F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&BeanFactory) -> T + Send + Sync + 'static,
    {
        let ctor = move |f: &BeanFactory| -> TargetResult<AnyArc> { Ok(erase(Arc::new(factory(f)))) };
        self.insert(name.into(), Lifetime::Singleton, Arc::new(ctor), std::any::type_name::<T>());
        self
    }

    // ----- Prototypes -----

    /// Registers a prototype: `factory` runs on every lookup.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use ferrous_target::BeanCollection;
    /// # use std::sync::Arc;
    /// #[derive(Default)]
    /// struct ShoppingCart {
    ///     items: Vec<String>,
    /// }
    ///
    /// let mut beans = BeanCollection::new();
    /// beans.add_prototype("cart", |_| ShoppingCart::default());
    /// let factory = beans.build();
    ///
    /// let a = factory.get_bean::<ShoppingCart>("cart").unwrap();
    /// let b = factory.get_bean::<ShoppingCart>("cart").unwrap();
    /// assert!(!Arc::ptr_eq(&a, &b));
    /// ```
    pub fn add_prototype<T, F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&BeanFactory) -> T + Send + Sync + 'static,
    {
        let ctor = move |f: &BeanFactory| -> TargetResult<AnyArc> { Ok(erase(Arc::new(factory(f)))) };
        self.insert(name.into(), Lifetime::Prototype, Arc::new(ctor), std::any::type_name::<T>());
        self
    }

    /// Registers a prototype producing trait objects.
    pub fn add_prototype_trait<T, F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&BeanFactory) -> Arc<T> + Send + Sync + 'static,
    {
        let ctor = move |f: &BeanFactory| -> TargetResult<AnyArc> { Ok(erase(factory(f))) };
        self.insert(name.into(), Lifetime::Prototype, Arc::new(ctor), std::any::type_name::<T>());
        self
    }

    /// Registers a prototype whose construction can fail.
    ///
    /// Errors surface from [`BeanFactory::get_bean`] unchanged.
    pub fn add_prototype_factory<T, F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&BeanFactory) -> TargetResult<Arc<T>> + Send + Sync + 'static,
    {
        let ctor = move |f: &BeanFactory| -> TargetResult<AnyArc> { factory(f).map(erase) };
        self.insert(name.into(), Lifetime::Prototype, Arc::new(ctor), std::any::type_name::<T>());
        self
    }

    /// Registers a bean only if no bean with that name exists yet.
    ///
    /// Returns `true` if the registration was added.
    pub fn try_add_prototype<T, F>(&mut self, name: impl Into<String>, factory: F) -> bool
    where
        T: Send + Sync + 'static,
        F: Fn(&BeanFactory) -> T + Send + Sync + 'static,
    {
        let name = name.into();
        if self.registry.contains(&name) {
            return false;
        }
        self.add_prototype(name, factory);
        true
    }

    pub fn contains_bean(&self, name: &str) -> bool {
        self.registry.contains(name)
    }

    pub fn len(&self) -> usize {
        self.registry.beans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.beans.is_empty()
    }

    /// Builds an immutable, shareable [`BeanFactory`].
    pub fn build(self) -> BeanFactory {
        tracing::debug!(beans = self.registry.beans.len(), "bean factory built");
        BeanFactory::from_registry(self.registry)
    }

    fn insert(&mut self, name: String, lifetime: Lifetime, ctor: crate::registration::Ctor, type_name: &'static str) {
        if self
            .registry
            .insert(name.clone(), Registration::new(lifetime, ctor, type_name))
            .is_some()
        {
            tracing::debug!(bean = %name, "bean definition overridden");
        }
    }
}

impl Default for BeanCollection {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_add_keeps_first_registration() {
        let mut beans = BeanCollection::new();
        assert!(beans.try_add_prototype("n", |_| 1u32));
        assert!(!beans.try_add_prototype("n", |_| 2u32));
        assert_eq!(beans.len(), 1);

        let factory = beans.build();
        assert_eq!(*factory.get_bean::<u32>("n").unwrap(), 1);
    }

    #[test]
    fn test_later_registration_overrides() {
        let mut beans = BeanCollection::new();
        beans.add_singleton("n", 1u32);
        beans.add_prototype("n", |_| 2u32);
        let factory = beans.build();
        assert_eq!(factory.lifetime("n"), Some(Lifetime::Prototype));
        assert_eq!(*factory.get_bean::<u32>("n").unwrap(), 2);
    }
}
