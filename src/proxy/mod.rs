//! Proxies: stable references that forward to a target source.
//!
//! Rust has no runtime method interception, so a proxy is an explicit
//! forwarding type. [`TargetProxy`] offers closure-based forwarding via
//! [`invoke`](TargetProxy::invoke); [`delegate_to_target!`](crate::delegate_to_target)
//! generates a forwarding implementation of a capability trait for any
//! type that is a [`TargetSource`].

use std::sync::Arc;

use crate::error::TargetResult;
use crate::traits::TargetSource;

mod scoped;

pub use scoped::{BoundScopedProxy, ScopedProxy, ScopedProxyBuilder};

/// Stable handle forwarding calls to whatever its target source supplies.
///
/// Every call fetches the current target, runs against it and releases
/// it again, so refreshes and swaps are picked up by the next call.
///
/// # Examples
///
/// ```rust
/// use ferrous_target::{RefreshableTargetSource, TargetProxy};
/// use std::sync::Arc;
///
/// let source = RefreshableTargetSource::builder()
///     .name("numbers")
///     .loader(|| Ok(Arc::new(vec![1, 2, 3])))
///     .build()
///     .unwrap();
/// let proxy = TargetProxy::new(source);
///
/// assert_eq!(proxy.invoke(|v| v.len()).unwrap(), 3);
/// assert_eq!(proxy.invoke(|v| v.iter().sum::<i32>()).unwrap(), 6);
/// ```
pub struct TargetProxy<T: ?Sized> {
    source: Arc<dyn TargetSource<T>>,
}

impl<T: ?Sized + 'static> TargetProxy<T> {
    pub fn new(source: impl TargetSource<T> + 'static) -> Self {
        Self {
            source: Arc::new(source),
        }
    }

    pub fn from_shared(source: Arc<dyn TargetSource<T>>) -> Self {
        Self { source }
    }

    /// Runs `f` against the current target.
    ///
    /// Errors from the target source (load failure, inactive scope) are
    /// returned before `f` runs.
    pub fn invoke<R>(&self, f: impl FnOnce(&T) -> R) -> TargetResult<R> {
        let target = self.source.get_target()?;
        let result = f(&*target);
        self.source.release_target(&target);
        Ok(result)
    }

    pub fn source(&self) -> &Arc<dyn TargetSource<T>> {
        &self.source
    }
}

impl<T: ?Sized> Clone for TargetProxy<T> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
        }
    }
}

impl<T: ?Sized> TargetSource<T> for TargetProxy<T> {
    fn get_target(&self) -> TargetResult<Arc<T>> {
        self.source.get_target()
    }

    fn release_target(&self, target: &Arc<T>) {
        self.source.release_target(target)
    }

    fn is_static(&self) -> bool {
        self.source.is_static()
    }
}

impl<T: ?Sized> std::fmt::Debug for TargetProxy<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetProxy")
            .field("static", &self.source.is_static())
            .finish_non_exhaustive()
    }
}

/// Implements a capability trait for a target source by forwarding.
///
/// Each listed method fetches the current target from the implementing
/// type (which must be a [`TargetSource`] of the given target type),
/// calls the same method on it with the arguments unchanged, then
/// releases the target. Every method must return `Result<_, E>` where
/// `E: From<TargetError>`, so target source failures surface through
/// the trait's own error type.
///
/// # Examples
///
/// ```
/// use ferrous_target::{delegate_to_target, HotSwappableTargetSource, TargetError, TargetProxy};
/// use std::sync::atomic::{AtomicU64, Ordering};
/// use std::sync::Arc;
///
/// pub trait Counter: Send + Sync {
///     fn increment(&self, by: u64) -> Result<u64, TargetError>;
///     fn value(&self) -> Result<u64, TargetError>;
/// }
///
/// struct AtomicCounter(AtomicU64);
///
/// impl Counter for AtomicCounter {
///     fn increment(&self, by: u64) -> Result<u64, TargetError> {
///         Ok(self.0.fetch_add(by, Ordering::SeqCst) + by)
///     }
///     fn value(&self) -> Result<u64, TargetError> {
///         Ok(self.0.load(Ordering::SeqCst))
///     }
/// }
///
/// delegate_to_target! {
///     impl Counter for TargetProxy<dyn Counter> as dyn Counter {
///         fn increment(&self, by: u64) -> Result<u64, TargetError>;
///         fn value(&self) -> Result<u64, TargetError>;
///     }
/// }
///
/// let first: Arc<dyn Counter> = Arc::new(AtomicCounter(AtomicU64::new(0)));
/// let source = Arc::new(HotSwappableTargetSource::new(first));
/// let counter = TargetProxy::new(source.clone());
///
/// assert_eq!(counter.increment(2).unwrap(), 2);
/// source.swap(Arc::new(AtomicCounter(AtomicU64::new(10))));
/// assert_eq!(counter.increment(1).unwrap(), 11);
/// assert_eq!(counter.value().unwrap(), 11);
/// ```
#[macro_export]
macro_rules! delegate_to_target {
    (
        impl $trait_:ident for $ty:ty as $target:ty {
            $(
                $(#[$meta:meta])*
                fn $method:ident(&self $(, $arg:ident : $arg_ty:ty)*) -> $ret:ty;
            )*
        }
    ) => {
        impl $trait_ for $ty {
            $(
                $(#[$meta])*
                fn $method(&self $(, $arg: $arg_ty)*) -> $ret {
                    let target = <$ty as $crate::TargetSource<$target>>::get_target(self)?;
                    let result = target.$method($($arg),*);
                    <$ty as $crate::TargetSource<$target>>::release_target(self, &target);
                    result
                }
            )*
        }
    };
}
