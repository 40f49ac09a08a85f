//! Bean lifetime definitions.

/// Bean lifetimes controlling instance caching inside a [`BeanFactory`](crate::BeanFactory)
///
/// Scoped proxies only accept prototype beans: the scope store, not the
/// container, decides how long each instance lives.
///
/// # Examples
///
/// ```rust
/// use ferrous_target::{BeanCollection, Lifetime};
/// use std::sync::Arc;
///
/// struct Config { url: String }
/// struct Cart { items: Vec<String> }
///
/// let mut beans = BeanCollection::new();
/// beans.add_singleton("config", Config { url: "postgres://localhost".to_string() });
/// beans.add_prototype("cart", |_| Cart { items: Vec::new() });
///
/// let factory = beans.build();
/// assert_eq!(factory.lifetime("config"), Some(Lifetime::Singleton));
/// assert_eq!(factory.lifetime("cart"), Some(Lifetime::Prototype));
///
/// // Singleton: same instance on every lookup
/// let c1 = factory.get_bean::<Config>("config").unwrap();
/// let c2 = factory.get_bean::<Config>("config").unwrap();
/// assert!(Arc::ptr_eq(&c1, &c2));
///
/// // Prototype: fresh instance on every lookup
/// let a = factory.get_bean::<Cart>("cart").unwrap();
/// let b = factory.get_bean::<Cart>("cart").unwrap();
/// assert!(!Arc::ptr_eq(&a, &b));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// Single instance per factory, cached forever
    Singleton,
    /// New instance per lookup, never cached
    ///
    /// Prototype beans are what refreshable and scoped target sources
    /// re-fetch: every refresh or every new scope gets its own instance.
    Prototype,
}

impl Lifetime {
    pub fn is_prototype(self) -> bool {
        self == Lifetime::Prototype
    }
}

impl std::fmt::Display for Lifetime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Lifetime::Singleton => f.write_str("singleton"),
            Lifetime::Prototype => f.write_str("prototype"),
        }
    }
}
