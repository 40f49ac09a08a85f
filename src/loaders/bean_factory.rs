use crate::error::{TargetError, TargetResult};
use crate::loaders::TargetLoader;
use crate::provider::BeanFactory;
use std::sync::Arc;

/// Loads targets by fetching a named bean from a [`BeanFactory`].
///
/// When the bean is a prototype each load yields a brand-new instance,
/// which is what refreshable and scoped target sources expect. A singleton
/// bean is accepted but always yields the same instance.
///
/// # Examples
///
/// ```rust
/// use ferrous_target::{BeanCollection, BeanFactoryLoader, TargetLoader};
/// use std::sync::Arc;
///
/// let mut beans = BeanCollection::new();
/// beans.add_prototype("settings", |_| vec![1u8, 2, 3]);
/// let loader = BeanFactoryLoader::new(beans.build(), "settings").unwrap();
///
/// let a: Arc<Vec<u8>> = loader.load().unwrap();
/// let b: Arc<Vec<u8>> = loader.load().unwrap();
/// assert!(!Arc::ptr_eq(&a, &b));
/// ```
#[derive(Debug, Clone)]
pub struct BeanFactoryLoader {
    factory: BeanFactory,
    bean_name: String,
}

impl BeanFactoryLoader {
    /// Fails with `NotFound` if the factory has no bean of that name.
    pub fn new(factory: BeanFactory, bean_name: impl Into<String>) -> TargetResult<Self> {
        let bean_name = bean_name.into();
        if !factory.contains_bean(&bean_name) {
            return Err(TargetError::NotFound(bean_name));
        }
        Ok(Self { factory, bean_name })
    }

    pub fn bean_name(&self) -> &str {
        &self.bean_name
    }

    pub fn factory(&self) -> &BeanFactory {
        &self.factory
    }
}

impl<T: ?Sized + Send + Sync + 'static> TargetLoader<T> for BeanFactoryLoader {
    fn load(&self) -> TargetResult<Arc<T>> {
        self.factory.get_bean::<T>(&self.bean_name)
    }

    fn describe(&self) -> String {
        format!("bean '{}'", self.bean_name)
    }
}
