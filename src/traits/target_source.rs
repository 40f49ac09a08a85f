//! Target source traits.

use std::sync::Arc;
use std::time::Instant;

use crate::error::TargetResult;

/// Supplies the object a proxy forwards calls to.
///
/// A target source hides where the current target comes from: a fixed
/// instance, a slot that may be refreshed, a scope store, or a fresh
/// prototype per call. Proxies call [`get_target`](Self::get_target)
/// before every forwarded method and [`release_target`](Self::release_target)
/// after it.
///
/// This trait is object-safe and implemented for `Arc<S>` where `S`
/// implements it, so sources can be shared freely.
///
/// # Examples
///
/// ```rust
/// use ferrous_target::{SingletonTargetSource, TargetSource};
/// use std::sync::Arc;
///
/// let source = SingletonTargetSource::new(Arc::new(String::from("fixed")));
/// let target = source.get_target().unwrap();
/// assert_eq!(target.as_str(), "fixed");
/// assert!(source.is_static());
/// source.release_target(&target);
/// ```
pub trait TargetSource<T: ?Sized>: Send + Sync {
    /// Returns the current target, loading it first if necessary.
    fn get_target(&self) -> TargetResult<Arc<T>>;

    /// Hands a target back after a call. No-op unless the source pools.
    fn release_target(&self, target: &Arc<T>) {
        let _ = target;
    }

    /// True when every call returns the same instance.
    fn is_static(&self) -> bool {
        false
    }
}

impl<T, S> TargetSource<T> for Arc<S>
where
    T: ?Sized,
    S: TargetSource<T> + ?Sized,
{
    fn get_target(&self) -> TargetResult<Arc<T>> {
        (**self).get_target()
    }

    fn release_target(&self, target: &Arc<T>) {
        (**self).release_target(target)
    }

    fn is_static(&self) -> bool {
        (**self).is_static()
    }
}

/// Administrative view of an object that can be reloaded on demand.
///
/// Management tooling holds `dyn Refreshable` handles without knowing the
/// target type.
pub trait Refreshable: Send + Sync {
    /// Forces a reload of the target, bypassing the refresh policy.
    fn refresh(&self) -> TargetResult<()>;

    /// Number of successful refreshes so far.
    fn refresh_count(&self) -> u64;

    /// When the last successful refresh completed.
    fn last_refresh(&self) -> Option<Instant>;
}
