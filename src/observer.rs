//! Observation hooks for target lifecycle events.
//!
//! Target sources report refreshes, failed refreshes and evictions to any
//! registered [`TargetObserver`]. Structured `tracing` events are emitted
//! regardless; observers are for callers that want to react or count.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::TargetError;

/// Observer trait for target lifecycle events.
///
/// Observer calls are made synchronously, some of them while the target
/// slot's lock is held. Keep implementations lightweight.
///
/// # Examples
///
/// ```
/// use ferrous_target::{RefreshableTargetSource, TargetError, TargetObserver, TargetSource};
/// use std::sync::{Arc, Mutex};
/// use std::time::Duration;
///
/// #[derive(Default)]
/// struct Recorder {
///     events: Mutex<Vec<String>>,
/// }
///
/// impl TargetObserver for Recorder {
///     fn refreshed(&self, target: &str, refresh_count: u64, _duration: Duration) {
///         self.events.lock().unwrap().push(format!("{}#{}", target, refresh_count));
///     }
///
///     fn refresh_failed(&self, target: &str, error: &TargetError) {
///         self.events.lock().unwrap().push(format!("{} failed: {}", target, error));
///     }
/// }
///
/// let recorder = Arc::new(Recorder::default());
/// let source = RefreshableTargetSource::builder()
///     .name("greeting")
///     .loader(|| Ok(Arc::new(String::from("hello"))))
///     .observer(recorder.clone())
///     .build()
///     .unwrap();
///
/// source.get_target().unwrap();
/// assert_eq!(*recorder.events.lock().unwrap(), vec!["greeting#1".to_string()]);
/// ```
pub trait TargetObserver: Send + Sync {
    /// Called before a loader is invoked.
    fn refreshing(&self, target: &str) {
        let _ = target;
    }

    /// Called after a successful refresh.
    fn refreshed(&self, target: &str, refresh_count: u64, duration: Duration);

    /// Called when a loader fails. The previous target, if any, stays visible.
    fn refresh_failed(&self, target: &str, error: &TargetError);

    /// Called when a target is dropped from its slot or scope.
    fn evicted(&self, target: &str) {
        let _ = target;
    }

    /// Called when a scoped instance is created inside a scope.
    fn scoped_created(&self, target: &str, scope: &str) {
        let _ = (target, scope);
    }
}

#[derive(Default, Clone)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn TargetObserver>>,
}

impl Observers {
    pub(crate) fn new() -> Self {
        Self {
            observers: Vec::new(),
        }
    }

    pub(crate) fn add(&mut self, observer: Arc<dyn TargetObserver>) {
        self.observers.push(observer);
    }

    #[inline]
    pub(crate) fn refreshing(&self, target: &str) {
        for observer in &self.observers {
            observer.refreshing(target);
        }
    }

    #[inline]
    pub(crate) fn refreshed(&self, target: &str, refresh_count: u64, duration: Duration) {
        for observer in &self.observers {
            observer.refreshed(target, refresh_count, duration);
        }
    }

    #[inline]
    pub(crate) fn refresh_failed(&self, target: &str, error: &TargetError) {
        for observer in &self.observers {
            observer.refresh_failed(target, error);
        }
    }

    #[inline]
    pub(crate) fn evicted(&self, target: &str) {
        for observer in &self.observers {
            observer.evicted(target);
        }
    }

    #[inline]
    pub(crate) fn scoped_created(&self, target: &str, scope: &str) {
        for observer in &self.observers {
            observer.scoped_created(target, scope);
        }
    }
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Observers({})", self.observers.len())
    }
}

/// Observer that forwards every event to `tracing` at `info`/`warn` level.
///
/// Target sources already log at `debug`; attach this when lifecycle
/// events should show up in default production logs.
pub struct LoggingObserver {
    prefix: String,
}

impl LoggingObserver {
    pub fn new() -> Self {
        Self {
            prefix: "ferrous-target".to_string(),
        }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl TargetObserver for LoggingObserver {
    fn refreshed(&self, target: &str, refresh_count: u64, duration: Duration) {
        tracing::info!(
            prefix = %self.prefix,
            target_name = target,
            refresh_count,
            elapsed_ms = duration.as_secs_f64() * 1000.0,
            "target refreshed"
        );
    }

    fn refresh_failed(&self, target: &str, error: &TargetError) {
        tracing::warn!(prefix = %self.prefix, target_name = target, %error, "target refresh failed");
    }

    fn evicted(&self, target: &str) {
        tracing::info!(prefix = %self.prefix, target_name = target, "target evicted");
    }

    fn scoped_created(&self, target: &str, scope: &str) {
        tracing::info!(prefix = %self.prefix, target_name = target, scope, "scoped target created");
    }
}

/// Observer that counts lifecycle events.
///
/// # Examples
///
/// ```
/// use ferrous_target::{MetricsObserver, RefreshableTargetSource, Refreshable, TargetSource};
/// use std::sync::Arc;
///
/// let metrics = Arc::new(MetricsObserver::new());
/// let source = RefreshableTargetSource::builder()
///     .loader(|| Ok(Arc::new(1u32)))
///     .observer(metrics.clone())
///     .build()
///     .unwrap();
///
/// source.get_target().unwrap();
/// source.refresh().unwrap();
/// assert_eq!(metrics.refresh_count(), 2);
/// assert_eq!(metrics.failure_count(), 0);
/// ```
pub struct MetricsObserver {
    refreshes: AtomicU64,
    failures: AtomicU64,
    evictions: AtomicU64,
    scoped_creations: AtomicU64,
    total_load_time: AtomicU64,
}

impl MetricsObserver {
    pub fn new() -> Self {
        Self {
            refreshes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            scoped_creations: AtomicU64::new(0),
            total_load_time: AtomicU64::new(0),
        }
    }

    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }

    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    pub fn eviction_count(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    pub fn scoped_creation_count(&self) -> u64 {
        self.scoped_creations.load(Ordering::Relaxed)
    }

    pub fn total_load_time(&self) -> Duration {
        Duration::from_nanos(self.total_load_time.load(Ordering::Relaxed))
    }

    pub fn average_load_time(&self) -> Option<Duration> {
        let count = self.refresh_count();
        if count == 0 {
            return None;
        }
        Some(Duration::from_nanos(self.total_load_time.load(Ordering::Relaxed) / count))
    }
}

impl Default for MetricsObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl TargetObserver for MetricsObserver {
    fn refreshed(&self, _target: &str, _refresh_count: u64, duration: Duration) {
        self.refreshes.fetch_add(1, Ordering::Relaxed);
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        self.total_load_time.fetch_add(nanos, Ordering::Relaxed);
    }

    fn refresh_failed(&self, _target: &str, _error: &TargetError) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    fn evicted(&self, _target: &str) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    fn scoped_created(&self, _target: &str, _scope: &str) {
        self.scoped_creations.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_average_load_time() {
        let metrics = MetricsObserver::new();
        assert_eq!(metrics.average_load_time(), None);

        metrics.refreshed("a", 1, Duration::from_millis(10));
        metrics.refreshed("a", 2, Duration::from_millis(30));
        assert_eq!(metrics.refresh_count(), 2);
        assert_eq!(metrics.total_load_time(), Duration::from_millis(40));
        assert_eq!(metrics.average_load_time(), Some(Duration::from_millis(20)));
    }

    #[test]
    fn test_observers_fan_out() {
        let a = Arc::new(MetricsObserver::new());
        let b = Arc::new(MetricsObserver::new());
        let mut observers = Observers::new();
        observers.add(a.clone());
        observers.add(b.clone());
        assert_eq!(format!("{:?}", observers), "Observers(2)");

        observers.evicted("x");
        observers.refresh_failed("x", &TargetError::NotFound("x".into()));
        assert_eq!(a.eviction_count(), 1);
        assert_eq!(b.failure_count(), 1);
    }
}
