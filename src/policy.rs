//! Refresh policy: when to look for staleness, and how.
//!
//! A refresh policy combines a [`RefreshCheckDelay`] (how often a staleness
//! probe may run) with a [`Staleness`] predicate (whether the cached target
//! must be replaced). The delay rate-limits the probe itself: once a check
//! is due the caller stamps the check time whether or not the predicate
//! ends up reporting staleness.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Minimum spacing between two staleness checks.
///
/// Configuration surfaces use milliseconds with two reserved values:
/// any negative number means [`Never`](RefreshCheckDelay::Never), zero
/// means [`Always`](RefreshCheckDelay::Always).
///
/// # Examples
///
/// ```rust
/// use ferrous_target::RefreshCheckDelay;
/// use std::time::Duration;
///
/// assert_eq!(RefreshCheckDelay::from_millis(-1), RefreshCheckDelay::Never);
/// assert_eq!(RefreshCheckDelay::from_millis(0), RefreshCheckDelay::Always);
/// assert_eq!(
///     RefreshCheckDelay::from_millis(100),
///     RefreshCheckDelay::Every(Duration::from_millis(100))
/// );
/// assert_eq!(RefreshCheckDelay::Every(Duration::from_millis(100)).as_millis(), 100);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RefreshCheckDelay {
    /// Never check once loaded
    #[default]
    Never,
    /// Check on every access
    Always,
    /// Check when more than the given time has passed since the last check
    Every(Duration),
}

impl RefreshCheckDelay {
    pub fn from_millis(millis: i64) -> Self {
        match millis {
            m if m < 0 => RefreshCheckDelay::Never,
            0 => RefreshCheckDelay::Always,
            m => RefreshCheckDelay::Every(Duration::from_millis(m as u64)),
        }
    }

    /// Millisecond form using the reserved sentinels (`-1` never, `0` always).
    pub fn as_millis(&self) -> i64 {
        match self {
            RefreshCheckDelay::Never => -1,
            RefreshCheckDelay::Always => 0,
            RefreshCheckDelay::Every(d) => i64::try_from(d.as_millis()).unwrap_or(i64::MAX),
        }
    }
}

impl fmt::Display for RefreshCheckDelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshCheckDelay::Never => f.write_str("never"),
            RefreshCheckDelay::Always => f.write_str("always"),
            RefreshCheckDelay::Every(d) => write!(f, "every {}ms", d.as_millis()),
        }
    }
}

/// Decides whether a staleness check is due.
///
/// A slot that has never been checked is always due (unless the delay is
/// [`Never`](RefreshCheckDelay::Never)). Otherwise the check is due only
/// when strictly more than the delay has elapsed since `last_check`.
///
/// # Examples
///
/// ```rust
/// use ferrous_target::{is_check_due, RefreshCheckDelay};
/// use std::time::{Duration, Instant};
///
/// let t0 = Instant::now();
/// let delay = RefreshCheckDelay::Every(Duration::from_millis(100));
///
/// assert!(is_check_due(t0, None, delay));
/// assert!(!is_check_due(t0 + Duration::from_millis(10), Some(t0), delay));
/// assert!(!is_check_due(t0 + Duration::from_millis(100), Some(t0), delay));
/// assert!(is_check_due(t0 + Duration::from_millis(101), Some(t0), delay));
/// assert!(!is_check_due(t0, None, RefreshCheckDelay::Never));
/// assert!(is_check_due(t0, Some(t0), RefreshCheckDelay::Always));
/// ```
pub fn is_check_due(now: Instant, last_check: Option<Instant>, delay: RefreshCheckDelay) -> bool {
    match delay {
        RefreshCheckDelay::Never => false,
        RefreshCheckDelay::Always => true,
        RefreshCheckDelay::Every(delay) => match last_check {
            None => true,
            Some(last) => now.saturating_duration_since(last) > delay,
        },
    }
}

/// Facts about the cached target handed to a [`Staleness`] predicate.
#[derive(Debug, Clone, Copy)]
pub struct LoadInfo {
    /// When the current target was loaded
    pub loaded_at: Instant,
    /// Time of the check in progress
    pub now: Instant,
    /// Successful refreshes so far, the current one included
    pub refresh_count: u64,
}

impl LoadInfo {
    pub fn age(&self) -> Duration {
        self.now.saturating_duration_since(self.loaded_at)
    }
}

/// Pluggable staleness predicate.
///
/// Closures `Fn(&T, &LoadInfo) -> bool` implement this trait directly.
pub trait Staleness<T: ?Sized>: Send + Sync {
    fn is_stale(&self, current: &T, info: &LoadInfo) -> bool;
}

impl<T, F> Staleness<T> for F
where
    T: ?Sized,
    F: Fn(&T, &LoadInfo) -> bool + Send + Sync,
{
    fn is_stale(&self, current: &T, info: &LoadInfo) -> bool {
        self(current, info)
    }
}

/// Never reports staleness: a loaded target is kept forever.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverStale;

impl<T: ?Sized> Staleness<T> for NeverStale {
    fn is_stale(&self, _current: &T, _info: &LoadInfo) -> bool {
        false
    }
}

/// Always reports staleness: every due check reloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysStale;

impl<T: ?Sized> Staleness<T> for AlwaysStale {
    fn is_stale(&self, _current: &T, _info: &LoadInfo) -> bool {
        true
    }
}

/// Reports staleness once the target is older than the given age.
#[derive(Debug, Clone, Copy)]
pub struct MaxAge(pub Duration);

impl<T: ?Sized> Staleness<T> for MaxAge {
    fn is_stale(&self, _current: &T, info: &LoadInfo) -> bool {
        info.age() > self.0
    }
}

/// Check delay plus staleness predicate for one target slot.
pub struct RefreshPolicy<T: ?Sized> {
    delay: RefreshCheckDelay,
    staleness: Arc<dyn Staleness<T>>,
}

impl<T: ?Sized + 'static> RefreshPolicy<T> {
    pub fn new(delay: RefreshCheckDelay, staleness: impl Staleness<T> + 'static) -> Self {
        Self {
            delay,
            staleness: Arc::new(staleness),
        }
    }

    /// Policy that loads once and never reloads on its own.
    pub fn never() -> Self {
        Self::new(RefreshCheckDelay::Never, NeverStale)
    }
}

impl<T: ?Sized> RefreshPolicy<T> {
    pub fn delay(&self) -> RefreshCheckDelay {
        self.delay
    }

    pub(crate) fn set_delay(&mut self, delay: RefreshCheckDelay) {
        self.delay = delay;
    }

    pub(crate) fn staleness(&self) -> Arc<dyn Staleness<T>> {
        Arc::clone(&self.staleness)
    }

    pub(crate) fn set_staleness(&mut self, staleness: Arc<dyn Staleness<T>>) {
        self.staleness = staleness;
    }

    pub fn is_check_due(&self, now: Instant, last_check: Option<Instant>) -> bool {
        is_check_due(now, last_check, self.delay)
    }

    pub fn is_stale(&self, current: &T, info: &LoadInfo) -> bool {
        self.staleness.is_stale(current, info)
    }
}

impl<T: ?Sized> Clone for RefreshPolicy<T> {
    fn clone(&self) -> Self {
        Self {
            delay: self.delay,
            staleness: Arc::clone(&self.staleness),
        }
    }
}

impl<T: ?Sized> fmt::Debug for RefreshPolicy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshPolicy")
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}
