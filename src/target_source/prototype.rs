use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{TargetError, TargetResult};
use crate::loaders::{BeanFactoryLoader, TargetLoader};
use crate::provider::BeanFactory;
use crate::traits::TargetSource;

/// Target source returning a brand-new instance on every call.
pub struct PrototypeTargetSource<T: ?Sized> {
    loader: Box<dyn TargetLoader<T>>,
    created: AtomicU64,
}

impl<T: ?Sized + Send + Sync + 'static> PrototypeTargetSource<T> {
    pub fn new(loader: impl TargetLoader<T> + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            created: AtomicU64::new(0),
        }
    }

    /// Prototype source over a named bean.
    ///
    /// Fails with `NotFound` for an unknown bean and with
    /// `SingletonNotAccepted` when the bean is a singleton.
    ///
    /// ```rust
    /// use ferrous_target::{BeanCollection, PrototypeTargetSource, TargetSource};
    /// use std::sync::Arc;
    ///
    /// let mut beans = BeanCollection::new();
    /// beans.add_prototype("job", |_| String::from("job"));
    /// beans.add_singleton("shared", String::from("shared"));
    /// let factory = beans.build();
    ///
    /// let source = PrototypeTargetSource::<String>::from_bean_factory(&factory, "job").unwrap();
    /// let a = source.get_target().unwrap();
    /// let b = source.get_target().unwrap();
    /// assert!(!Arc::ptr_eq(&a, &b));
    /// assert_eq!(source.created_count(), 2);
    ///
    /// assert!(PrototypeTargetSource::<String>::from_bean_factory(&factory, "shared").is_err());
    /// ```
    pub fn from_bean_factory(factory: &BeanFactory, bean_name: &str) -> TargetResult<Self> {
        let loader = BeanFactoryLoader::new(factory.clone(), bean_name)?;
        if !factory.is_prototype(bean_name) {
            return Err(TargetError::SingletonNotAccepted(bean_name.to_string()));
        }
        Ok(Self::new(loader))
    }

    /// Number of instances handed out so far.
    pub fn created_count(&self) -> u64 {
        self.created.load(Ordering::Relaxed)
    }
}

impl<T: ?Sized + Send + Sync + 'static> TargetSource<T> for PrototypeTargetSource<T> {
    fn get_target(&self) -> TargetResult<Arc<T>> {
        let target = self.loader.load()?;
        self.created.fetch_add(1, Ordering::Relaxed);
        Ok(target)
    }
}
