//! Loader strategies that produce fresh target instances.
//!
//! A [`TargetLoader`] is the single outbound call a target source makes:
//! "give me a new instance". Three strategies ship with the crate:
//!
//! - [`BeanFactoryLoader`]: fetch a fresh prototype from a [`BeanFactory`](crate::BeanFactory) by name
//! - [`RepositoryLoader`]: reload a record from a persistent store by primary key
//! - [`ScriptLoader`]: recompile a dynamic script and instantiate it
//!
//! Any `Fn() -> TargetResult<Arc<T>>` closure is a loader too.

use std::sync::Arc;

use crate::error::TargetResult;

mod bean_factory;
mod repository;
mod script;

pub use bean_factory::BeanFactoryLoader;
pub use repository::{Record, Repository, RepositoryLoader, RepositoryStaleness};
pub use script::{
    FileScriptSource, InMemoryScriptSource, ScriptCompiler, ScriptLoader, ScriptModified,
    ScriptSource,
};

/// Produces a fresh target instance.
///
/// Implementations must either return a usable instance or an error; they
/// never return a partially built object. Loaders are called while the
/// owning slot's lock is held, so they must not call back into the same
/// target source.
pub trait TargetLoader<T: ?Sized>: Send + Sync {
    fn load(&self) -> TargetResult<Arc<T>>;

    /// Human-readable description used in logs and error messages.
    fn describe(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}

impl<T, F> TargetLoader<T> for F
where
    T: ?Sized,
    F: Fn() -> TargetResult<Arc<T>> + Send + Sync,
{
    fn load(&self) -> TargetResult<Arc<T>> {
        self()
    }

    fn describe(&self) -> String {
        "closure".to_string()
    }
}
