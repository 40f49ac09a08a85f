//! The refreshable target slot.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::clock::{Clock, SystemClock};
use crate::config::TargetSourceConfig;
use crate::error::{TargetError, TargetResult};
use crate::loaders::TargetLoader;
use crate::observer::{Observers, TargetObserver};
use crate::policy::{LoadInfo, RefreshCheckDelay, RefreshPolicy, Staleness};
use crate::traits::{Refreshable, TargetSource};

/// Whether a slot currently holds a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Nothing loaded yet, or evicted
    Empty,
    Loaded,
}

/// Point-in-time snapshot of a slot's bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshStats {
    pub state: SlotState,
    pub refresh_count: u64,
    pub last_refresh: Option<Instant>,
    pub last_refresh_check: Option<Instant>,
}

struct TargetSlot<T: ?Sized> {
    current: Option<Arc<T>>,
    last_refresh_check: Option<Instant>,
    last_refresh: Option<Instant>,
    refresh_count: u64,
}

/// Owns one target object and reloads it when the policy says so.
///
/// Every access runs "check, maybe reload, read" under one exclusive lock,
/// so concurrent callers never load twice and never observe a partially
/// replaced target. The loader runs while that lock is held: a slow loader
/// blocks every caller of this source until it returns.
///
/// A failed reload leaves the previous target in place and returns the
/// error to the caller that triggered it. If nothing was loaded yet the
/// slot stays empty and the next call tries again.
///
/// # Examples
///
/// ```rust
/// use ferrous_target::{
///     AlwaysStale, ManualClock, RefreshCheckDelay, RefreshableTargetSource, TargetSource,
/// };
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let loads = Arc::new(AtomicU32::new(0));
/// let counter = loads.clone();
/// let clock = ManualClock::new();
///
/// let source = RefreshableTargetSource::builder()
///     .name("holder")
///     .loader(move || Ok(Arc::new(counter.fetch_add(1, Ordering::SeqCst) + 1)))
///     .refresh_check_delay(RefreshCheckDelay::Every(Duration::from_millis(100)))
///     .staleness(AlwaysStale)
///     .clock(clock.clone())
///     .build()
///     .unwrap();
///
/// assert_eq!(*source.get_target().unwrap(), 1);
/// clock.advance(Duration::from_millis(10));
/// assert_eq!(*source.get_target().unwrap(), 1);
/// clock.advance(Duration::from_millis(140));
/// assert_eq!(*source.get_target().unwrap(), 2);
/// assert_eq!(source.stats().refresh_count, 2);
/// ```
pub struct RefreshableTargetSource<T: ?Sized> {
    name: String,
    slot: Mutex<TargetSlot<T>>,
    loader: Box<dyn TargetLoader<T>>,
    policy: RefreshPolicy<T>,
    clock: Arc<dyn Clock>,
    observers: Observers,
}

impl<T: ?Sized + Send + Sync + 'static> RefreshableTargetSource<T> {
    pub fn builder() -> RefreshableTargetSourceBuilder<T> {
        RefreshableTargetSourceBuilder::new()
    }

    /// Creates an empty slot using the system clock.
    pub fn new(
        name: impl Into<String>,
        loader: impl TargetLoader<T> + 'static,
        policy: RefreshPolicy<T>,
    ) -> Self {
        Self::from_parts(
            name.into(),
            Box::new(loader),
            policy,
            Arc::new(SystemClock),
            Observers::new(),
        )
    }

    fn from_parts(
        name: String,
        loader: Box<dyn TargetLoader<T>>,
        policy: RefreshPolicy<T>,
        clock: Arc<dyn Clock>,
        observers: Observers,
    ) -> Self {
        Self {
            name,
            slot: Mutex::new(TargetSlot {
                current: None,
                last_refresh_check: None,
                last_refresh: None,
                refresh_count: 0,
            }),
            loader,
            policy,
            clock,
            observers,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn policy(&self) -> &RefreshPolicy<T> {
        &self.policy
    }

    /// Loads a fresh target unconditionally and returns it.
    ///
    /// The policy is bypassed and the check window is left untouched.
    pub fn refresh(&self) -> TargetResult<Arc<T>> {
        let mut slot = self.slot.lock();
        self.refresh_locked(&mut slot)
    }

    /// Drops the current target. Returns `true` if one was loaded.
    ///
    /// The next [`get_target`](TargetSource::get_target) loads a new one.
    pub fn evict(&self) -> bool {
        let evicted = self.slot.lock().current.take().is_some();
        if evicted {
            tracing::debug!(target_name = %self.name, "target evicted");
            self.observers.evicted(&self.name);
        }
        evicted
    }

    pub fn state(&self) -> SlotState {
        if self.slot.lock().current.is_some() {
            SlotState::Loaded
        } else {
            SlotState::Empty
        }
    }

    pub fn stats(&self) -> RefreshStats {
        let slot = self.slot.lock();
        RefreshStats {
            state: if slot.current.is_some() {
                SlotState::Loaded
            } else {
                SlotState::Empty
            },
            refresh_count: slot.refresh_count,
            last_refresh: slot.last_refresh,
            last_refresh_check: slot.last_refresh_check,
        }
    }

    /// When the policy last performed a staleness check.
    pub fn last_refresh_check(&self) -> Option<Instant> {
        self.slot.lock().last_refresh_check
    }

    fn refresh_locked(&self, slot: &mut TargetSlot<T>) -> TargetResult<Arc<T>> {
        tracing::trace!(target_name = %self.name, loader = %self.loader.describe(), "refreshing target");
        self.observers.refreshing(&self.name);
        let started = self.clock.now();

        match self.loader.load() {
            Ok(fresh) => {
                let now = self.clock.now();
                slot.current = Some(Arc::clone(&fresh));
                slot.refresh_count += 1;
                slot.last_refresh = Some(now);

                let duration = now.saturating_duration_since(started);
                tracing::debug!(
                    target_name = %self.name,
                    refresh_count = slot.refresh_count,
                    ?duration,
                    "target refreshed"
                );
                self.observers.refreshed(&self.name, slot.refresh_count, duration);
                Ok(fresh)
            }
            Err(error) => {
                tracing::warn!(
                    target_name = %self.name,
                    error = %error,
                    keeps_previous = slot.current.is_some(),
                    "target refresh failed"
                );
                self.observers.refresh_failed(&self.name, &error);
                Err(error)
            }
        }
    }
}

impl<T: ?Sized + Send + Sync + 'static> TargetSource<T> for RefreshableTargetSource<T> {
    fn get_target(&self) -> TargetResult<Arc<T>> {
        let mut slot = self.slot.lock();
        let now = self.clock.now();

        // The window restarts on every due check, stale or not.
        let check_due = self.policy.is_check_due(now, slot.last_refresh_check);
        if check_due {
            slot.last_refresh_check = Some(now);
        }

        if let Some(current) = &slot.current {
            if !check_due {
                return Ok(Arc::clone(current));
            }
            let info = LoadInfo {
                loaded_at: slot.last_refresh.unwrap_or(now),
                now,
                refresh_count: slot.refresh_count,
            };
            if !self.policy.is_stale(current, &info) {
                return Ok(Arc::clone(current));
            }
            tracing::trace!(target_name = %self.name, "target is stale");
        }

        self.refresh_locked(&mut slot)
    }
}

impl<T: ?Sized + Send + Sync + 'static> Refreshable for RefreshableTargetSource<T> {
    fn refresh(&self) -> TargetResult<()> {
        RefreshableTargetSource::refresh(self).map(|_| ())
    }

    fn refresh_count(&self) -> u64 {
        self.slot.lock().refresh_count
    }

    fn last_refresh(&self) -> Option<Instant> {
        self.slot.lock().last_refresh
    }
}

impl<T: ?Sized> fmt::Debug for RefreshableTargetSource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.slot.lock();
        f.debug_struct("RefreshableTargetSource")
            .field("name", &self.name)
            .field("loaded", &slot.current.is_some())
            .field("refresh_count", &slot.refresh_count)
            .field("policy", &self.policy)
            .field("observers", &self.observers)
            .finish()
    }
}

/// Builder for [`RefreshableTargetSource`].
///
/// Only the loader is required. Defaults: the loader's description as
/// name, [`RefreshCheckDelay::Never`], a predicate that is never stale,
/// and the system clock.
pub struct RefreshableTargetSourceBuilder<T: ?Sized> {
    name: Option<String>,
    loader: Option<Box<dyn TargetLoader<T>>>,
    delay: RefreshCheckDelay,
    staleness: Option<Arc<dyn Staleness<T>>>,
    clock: Option<Arc<dyn Clock>>,
    observers: Observers,
}

impl<T: ?Sized + Send + Sync + 'static> RefreshableTargetSourceBuilder<T> {
    pub fn new() -> Self {
        Self {
            name: None,
            loader: None,
            delay: RefreshCheckDelay::Never,
            staleness: None,
            clock: None,
            observers: Observers::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn loader(mut self, loader: impl TargetLoader<T> + 'static) -> Self {
        self.loader = Some(Box::new(loader));
        self
    }

    pub fn refresh_check_delay(mut self, delay: RefreshCheckDelay) -> Self {
        self.delay = delay;
        self
    }

    pub fn staleness(mut self, staleness: impl Staleness<T> + 'static) -> Self {
        self.staleness = Some(Arc::new(staleness));
        self
    }

    /// Replaces both the check delay and the staleness predicate.
    pub fn policy(mut self, policy: RefreshPolicy<T>) -> Self {
        self.delay = policy.delay();
        self.staleness = Some(policy.staleness());
        self
    }

    pub fn clock(mut self, clock: impl Clock) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    pub fn observer(mut self, observer: Arc<dyn TargetObserver>) -> Self {
        self.observers.add(observer);
        self
    }

    /// Applies externally configured settings.
    pub fn config(mut self, config: &TargetSourceConfig) -> Self {
        self.delay = config.refresh_check_delay();
        self
    }

    /// Fails with `InvalidConfiguration` when no loader was set.
    pub fn build(self) -> TargetResult<RefreshableTargetSource<T>> {
        let loader = self.loader.ok_or_else(|| {
            TargetError::invalid_configuration("refreshable target source requires a loader")
        })?;
        let name = self.name.unwrap_or_else(|| loader.describe());

        let mut policy = RefreshPolicy::never();
        policy.set_delay(self.delay);
        if let Some(staleness) = self.staleness {
            policy.set_staleness(staleness);
        }

        tracing::debug!(target_name = %name, delay = %self.delay, "refreshable target source configured");
        Ok(RefreshableTargetSource::from_parts(
            name,
            loader,
            policy,
            self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            self.observers,
        ))
    }
}

impl<T: ?Sized + Send + Sync + 'static> Default for RefreshableTargetSourceBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
