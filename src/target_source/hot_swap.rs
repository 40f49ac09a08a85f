use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::TargetResult;
use crate::traits::TargetSource;

/// Target source whose target can be replaced at runtime.
///
/// Proxies over a hot-swappable source pick up the new target on their
/// next call; calls already in flight finish on the old one.
///
/// # Examples
///
/// ```rust
/// use ferrous_target::{HotSwappableTargetSource, TargetProxy};
/// use std::sync::Arc;
///
/// let source = Arc::new(HotSwappableTargetSource::new(Arc::new(String::from("v1"))));
/// let proxy = TargetProxy::new(source.clone());
///
/// assert_eq!(proxy.invoke(|s| s.clone()).unwrap(), "v1");
/// let old = source.swap(Arc::new(String::from("v2")));
/// assert_eq!(old.as_str(), "v1");
/// assert_eq!(proxy.invoke(|s| s.clone()).unwrap(), "v2");
/// ```
pub struct HotSwappableTargetSource<T: ?Sized> {
    target: RwLock<Arc<T>>,
    swaps: AtomicU64,
}

impl<T: ?Sized + Send + Sync> HotSwappableTargetSource<T> {
    pub fn new(initial: Arc<T>) -> Self {
        Self {
            target: RwLock::new(initial),
            swaps: AtomicU64::new(0),
        }
    }

    /// Replaces the target and returns the previous one.
    pub fn swap(&self, new_target: Arc<T>) -> Arc<T> {
        let old = std::mem::replace(&mut *self.target.write(), new_target);
        let swaps = self.swaps.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(swaps, "target swapped");
        old
    }

    pub fn swap_count(&self) -> u64 {
        self.swaps.load(Ordering::Relaxed)
    }

    pub fn current(&self) -> Arc<T> {
        self.target.read().clone()
    }
}

impl<T: ?Sized + Send + Sync> TargetSource<T> for HotSwappableTargetSource<T> {
    fn get_target(&self) -> TargetResult<Arc<T>> {
        Ok(self.current())
    }
}

impl<T: ?Sized> std::fmt::Debug for HotSwappableTargetSource<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HotSwappableTargetSource")
            .field("swaps", &self.swaps.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
