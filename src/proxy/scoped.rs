//! Scoped proxies: one stable reference, one target per scope instance.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{TargetError, TargetResult};
use crate::observer::{Observers, TargetObserver};
use crate::provider::BeanFactory;
use crate::scope::{ScopeContext, ScopeKind, ScopeStore};
use crate::target_source::ScopedTargetSource;
use crate::traits::{Handle, ScopedObject, TargetSource};

/// Stable reference to a prototype bean resolved per scope instance.
///
/// The proxy itself is a singleton: clones share identity
/// ([`ptr_eq`](Self::ptr_eq)) and can be handed to any number of callers.
/// Each call names its scope through a [`ScopeContext`], either per call
/// ([`target_in`](Self::target_in), [`invoke_in`](Self::invoke_in)) or by
/// [`bind`](Self::bind)ing a context once. With the `async` feature the
/// proxy is also a [`TargetSource`] that reads the task-local context.
///
/// A call whose context carries no key for the proxy's scope kind, or
/// whose scope was never begun, fails with
/// [`TargetError::ScopeNotActive`].
///
/// # Examples
///
/// ```rust
/// use ferrous_target::{BeanCollection, MapScopeStore, ScopeContext, ScopedProxy};
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::sync::Arc;
///
/// #[derive(Debug)]
/// struct Cart {
///     id: u32,
/// }
///
/// let ids = Arc::new(AtomicU32::new(0));
/// let next = ids.clone();
/// let mut beans = BeanCollection::new();
/// beans.add_prototype("cart", move |_| Cart { id: next.fetch_add(1, Ordering::SeqCst) + 1 });
///
/// let sessions = Arc::new(MapScopeStore::session());
/// let cart = ScopedProxy::<Cart>::builder()
///     .target_bean_name("cart")
///     .bean_factory(beans.build())
///     .store(sessions.clone())
///     .build()
///     .unwrap();
///
/// sessions.begin_scope("alice");
/// sessions.begin_scope("bob");
/// let alice = ScopeContext::new().with_session("alice");
/// let bob = ScopeContext::new().with_session("bob");
///
/// assert_eq!(cart.invoke_in(&alice, |c| c.id).unwrap(), 1);
/// assert_eq!(cart.invoke_in(&bob, |c| c.id).unwrap(), 2);
/// assert_eq!(cart.invoke_in(&alice, |c| c.id).unwrap(), 1);
///
/// cart.remove_in(&alice).unwrap();
/// assert_eq!(cart.invoke_in(&alice, |c| c.id).unwrap(), 3);
/// assert_eq!(cart.invoke_in(&bob, |c| c.id).unwrap(), 2);
///
/// let nobody = ScopeContext::new();
/// assert!(cart.target_in(&nobody).unwrap_err().is_scope_not_active());
/// ```
pub struct ScopedProxy<T: ?Sized> {
    inner: Arc<ScopedTargetSource<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> ScopedProxy<T> {
    pub fn builder() -> ScopedProxyBuilder<T> {
        ScopedProxyBuilder::new()
    }

    pub fn from_source(source: ScopedTargetSource<T>) -> Self {
        Self {
            inner: Arc::new(source),
        }
    }

    /// True if both proxies are the same proxy instance.
    pub fn ptr_eq(&self, other: &ScopedProxy<T>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn source(&self) -> &ScopedTargetSource<T> {
        &self.inner
    }

    pub fn kind(&self) -> ScopeKind {
        self.inner.kind()
    }

    pub fn target_bean_name(&self) -> &str {
        self.inner.target_bean_name()
    }

    pub fn scope_name(&self) -> &str {
        self.inner.scope_name()
    }

    /// Target for the scope bound in `ctx`, created on first use.
    pub fn target_in(&self, ctx: &ScopeContext) -> TargetResult<Arc<T>> {
        self.inner.get_target_in(ctx)
    }

    /// Runs `f` against the target of the scope bound in `ctx`.
    pub fn invoke_in<R>(&self, ctx: &ScopeContext, f: impl FnOnce(&T) -> R) -> TargetResult<R> {
        let target = self.inner.get_target_in(ctx)?;
        Ok(f(&*target))
    }

    /// Evicts the target of the scope bound in `ctx`.
    ///
    /// The next call in that scope creates a new instance; other scopes
    /// are unaffected. Removing an instance that was never created is not
    /// an error.
    pub fn remove_in(&self, ctx: &ScopeContext) -> TargetResult<()> {
        self.inner.remove_in(ctx).map(|_| ())
    }

    /// Pins the proxy to one scope context.
    pub fn bind(&self, ctx: ScopeContext) -> BoundScopedProxy<T> {
        BoundScopedProxy {
            proxy: self.clone(),
            context: ctx,
        }
    }

    /// Handle describing this proxy. Persistent when the store is.
    pub fn handle(&self) -> Handle {
        Handle::new(
            self.target_bean_name(),
            self.scope_name(),
            self.kind(),
            self.inner.store().is_persistent(),
        )
    }

    /// Rebuilds a proxy from a handle over this proxy's store and factory.
    ///
    /// The reconnected proxy resolves to the same instances as the proxy
    /// the handle was taken from.
    ///
    /// # Errors
    ///
    /// [`TargetError::HandleNotPersistent`] when the handle or the store is
    /// not persistent, or the handle names another bean or scope kind.
    pub fn reconnect(&self, handle: &Handle) -> TargetResult<ScopedProxy<T>> {
        if !handle.is_persistent() || !self.inner.store().is_persistent() {
            return Err(TargetError::HandleNotPersistent(format!(
                "handle for '{}' cannot be reconnected",
                handle.target_bean_name()
            )));
        }
        if handle.target_bean_name() != self.target_bean_name() || handle.kind() != self.kind() {
            return Err(TargetError::HandleNotPersistent(format!(
                "handle for '{}' ({}) does not belong to '{}' ({})",
                handle.target_bean_name(),
                handle.kind(),
                self.target_bean_name(),
                self.kind()
            )));
        }

        let source = ScopedTargetSource::with_observers(
            self.inner.factory().clone(),
            handle.target_bean_name().to_string(),
            Some(handle.scope_name().to_string()),
            Arc::clone(self.inner.store()),
            self.inner.observers().clone(),
        )?;
        tracing::debug!(target_name = %handle.target_bean_name(), scope_name = %handle.scope_name(), "scoped proxy reconnected");
        Ok(Self::from_source(source))
    }
}

impl<T: ?Sized> Clone for ScopedProxy<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: ?Sized> std::fmt::Debug for ScopedProxy<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ScopedProxy").field(&self.inner).finish()
    }
}

#[cfg(feature = "async")]
impl<T: ?Sized + Send + Sync + 'static> TargetSource<T> for ScopedProxy<T> {
    fn get_target(&self) -> TargetResult<Arc<T>> {
        let key = ScopeContext::current_key(self.kind())?;
        self.inner.get_target_for(&key)
    }
}

#[cfg(feature = "async")]
impl<T: ?Sized + Send + Sync + 'static> ScopedObject for ScopedProxy<T> {
    fn target_bean_name(&self) -> &str {
        self.inner.target_bean_name()
    }

    fn scope_name(&self) -> &str {
        self.inner.scope_name()
    }

    fn handle(&self) -> Handle {
        ScopedProxy::handle(self)
    }

    fn remove(&self) -> TargetResult<()> {
        let key = ScopeContext::current_key(self.kind())?;
        self.inner.remove_for(&key).map(|_| ())
    }
}

/// A [`ScopedProxy`] pinned to one [`ScopeContext`].
///
/// Implements [`TargetSource`] and [`ScopedObject`], so it can back a
/// [`TargetProxy`](crate::TargetProxy) or a
/// [`delegate_to_target!`](crate::delegate_to_target) forwarding type.
pub struct BoundScopedProxy<T: ?Sized> {
    proxy: ScopedProxy<T>,
    context: ScopeContext,
}

impl<T: ?Sized + Send + Sync + 'static> BoundScopedProxy<T> {
    pub fn context(&self) -> &ScopeContext {
        &self.context
    }

    pub fn proxy(&self) -> &ScopedProxy<T> {
        &self.proxy
    }

    pub fn invoke<R>(&self, f: impl FnOnce(&T) -> R) -> TargetResult<R> {
        self.proxy.invoke_in(&self.context, f)
    }
}

impl<T: ?Sized> Clone for BoundScopedProxy<T> {
    fn clone(&self) -> Self {
        Self {
            proxy: self.proxy.clone(),
            context: self.context.clone(),
        }
    }
}

impl<T: ?Sized + Send + Sync + 'static> TargetSource<T> for BoundScopedProxy<T> {
    fn get_target(&self) -> TargetResult<Arc<T>> {
        self.proxy.target_in(&self.context)
    }
}

impl<T: ?Sized + Send + Sync + 'static> ScopedObject for BoundScopedProxy<T> {
    fn target_bean_name(&self) -> &str {
        self.proxy.target_bean_name()
    }

    fn scope_name(&self) -> &str {
        self.proxy.scope_name()
    }

    fn handle(&self) -> Handle {
        self.proxy.handle()
    }

    fn remove(&self) -> TargetResult<()> {
        self.proxy.remove_in(&self.context)
    }
}

/// Builder for [`ScopedProxy`].
///
/// The bean factory, the scope store and the target bean name are
/// required; everything is validated in [`build`](Self::build), not on
/// first use.
pub struct ScopedProxyBuilder<T: ?Sized> {
    target_bean_name: Option<String>,
    scope_name: Option<String>,
    factory: Option<BeanFactory>,
    store: Option<Arc<dyn ScopeStore>>,
    observers: Observers,
    _target: PhantomData<fn() -> Arc<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> ScopedProxyBuilder<T> {
    pub fn new() -> Self {
        Self {
            target_bean_name: None,
            scope_name: None,
            factory: None,
            store: None,
            observers: Observers::new(),
            _target: PhantomData,
        }
    }

    /// Name of the prototype bean backing the proxy.
    pub fn target_bean_name(mut self, name: impl Into<String>) -> Self {
        self.target_bean_name = Some(name.into());
        self
    }

    /// Attribute name inside the scope. Defaults to the bean name.
    pub fn scope_name(mut self, name: impl Into<String>) -> Self {
        self.scope_name = Some(name.into());
        self
    }

    pub fn bean_factory(mut self, factory: BeanFactory) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn store(mut self, store: Arc<dyn ScopeStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn TargetObserver>) -> Self {
        self.observers.add(observer);
        self
    }

    /// # Errors
    ///
    /// - [`TargetError::InvalidConfiguration`] for a missing collaborator
    /// - [`TargetError::NotFound`] for an unknown target bean
    /// - [`TargetError::SingletonNotAccepted`] for a singleton target bean
    pub fn build(self) -> TargetResult<ScopedProxy<T>> {
        let factory = self.factory.ok_or_else(|| {
            TargetError::invalid_configuration("scoped proxy requires a bean factory")
        })?;
        let store = self.store.ok_or_else(|| {
            TargetError::invalid_configuration("scoped proxy requires a scope store")
        })?;
        let target_bean_name = self.target_bean_name.ok_or_else(|| {
            TargetError::invalid_configuration("scoped proxy requires a target bean name")
        })?;

        let source = ScopedTargetSource::with_observers(
            factory,
            target_bean_name,
            self.scope_name,
            store,
            self.observers,
        )?;
        tracing::info!(
            target_name = %source.target_bean_name(),
            kind = %source.kind(),
            "scoped proxy created"
        );
        Ok(ScopedProxy::from_source(source))
    }
}

impl<T: ?Sized + Send + Sync + 'static> Default for ScopedProxyBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
