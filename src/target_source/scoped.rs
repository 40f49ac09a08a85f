use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{TargetError, TargetResult};
use crate::key::ScopeKey;
use crate::observer::Observers;
use crate::provider::BeanFactory;
use crate::registration::unerase;
use crate::scope::{ScopeContext, ScopeKind, ScopeStore};

/// Resolves a prototype bean per scope instance.
///
/// The first call within a scope creates the instance from the bean
/// factory and stores it under [`scope_name`](Self::scope_name); later
/// calls in the same scope get that instance back. Creation is lazy:
/// nothing is instantiated until a scope actually asks for it.
pub struct ScopedTargetSource<T: ?Sized> {
    factory: BeanFactory,
    target_bean_name: String,
    scope_name: String,
    store: Arc<dyn ScopeStore>,
    observers: Observers,
    _target: PhantomData<fn() -> Arc<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> ScopedTargetSource<T> {
    /// Validates the target bean eagerly.
    ///
    /// # Errors
    ///
    /// - [`TargetError::NotFound`] if the factory has no such bean
    /// - [`TargetError::SingletonNotAccepted`] if the bean is a singleton
    pub fn new(
        factory: BeanFactory,
        target_bean_name: impl Into<String>,
        scope_name: Option<String>,
        store: Arc<dyn ScopeStore>,
    ) -> TargetResult<Self> {
        Self::with_observers(factory, target_bean_name.into(), scope_name, store, Observers::new())
    }

    pub(crate) fn with_observers(
        factory: BeanFactory,
        target_bean_name: String,
        scope_name: Option<String>,
        store: Arc<dyn ScopeStore>,
        observers: Observers,
    ) -> TargetResult<Self> {
        match factory.lifetime(&target_bean_name) {
            None => return Err(TargetError::NotFound(target_bean_name)),
            Some(lifetime) if !lifetime.is_prototype() => {
                return Err(TargetError::SingletonNotAccepted(target_bean_name))
            }
            Some(_) => {}
        }

        let scope_name = scope_name.unwrap_or_else(|| target_bean_name.clone());
        Ok(Self {
            factory,
            target_bean_name,
            scope_name,
            store,
            observers,
            _target: PhantomData,
        })
    }

    pub fn target_bean_name(&self) -> &str {
        &self.target_bean_name
    }

    /// Attribute name the instance is stored under inside a scope.
    pub fn scope_name(&self) -> &str {
        &self.scope_name
    }

    pub fn kind(&self) -> ScopeKind {
        self.store.kind()
    }

    pub fn store(&self) -> &Arc<dyn ScopeStore> {
        &self.store
    }

    pub fn factory(&self) -> &BeanFactory {
        &self.factory
    }

    pub(crate) fn observers(&self) -> &Observers {
        &self.observers
    }

    /// Instance for the scope bound in `ctx`, created on first use.
    pub fn get_target_in(&self, ctx: &ScopeContext) -> TargetResult<Arc<T>> {
        let key = ctx.require(self.kind())?;
        self.get_target_for(key)
    }

    /// Instance for the given scope key, created on first use.
    pub fn get_target_for(&self, scope: &ScopeKey) -> TargetResult<Arc<T>> {
        let mut created = false;
        let instance = self.store.get_or_create(scope, &self.scope_name, &mut || {
            let instance = self.factory.get_any(&self.target_bean_name)?;
            created = true;
            Ok(instance)
        })?;

        if created {
            tracing::debug!(
                target_name = %self.target_bean_name,
                scope = %scope,
                kind = %self.kind(),
                "scoped target created"
            );
            self.observers.scoped_created(&self.target_bean_name, scope.as_str());
        }
        unerase::<T>(&self.target_bean_name, &instance)
    }

    /// Evicts the instance of the scope bound in `ctx`.
    pub fn remove_in(&self, ctx: &ScopeContext) -> TargetResult<bool> {
        let key = ctx.require(self.kind())?;
        self.remove_for(key)
    }

    /// Evicts the instance of the given scope. Returns `true` if one existed.
    pub fn remove_for(&self, scope: &ScopeKey) -> TargetResult<bool> {
        let removed = self.store.remove(scope, &self.scope_name)?.is_some();
        if removed {
            tracing::debug!(target_name = %self.target_bean_name, scope = %scope, "scoped target removed");
            self.observers.evicted(&self.target_bean_name);
        }
        Ok(removed)
    }
}

impl<T: ?Sized> std::fmt::Debug for ScopedTargetSource<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedTargetSource")
            .field("target_bean_name", &self.target_bean_name)
            .field("scope_name", &self.scope_name)
            .field("kind", &self.store.kind())
            .finish()
    }
}
