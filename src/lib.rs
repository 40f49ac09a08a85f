//! # ferrous-target
//!
//! Refreshable, hot-swappable and scoped target sources for Rust services.
//!
//! A *target source* supplies the object a stable proxy forwards calls to.
//! The object behind the proxy may be reloaded when it goes stale, swapped
//! at runtime, or resolved per HTTP session or request, while callers keep
//! holding the same proxy.
//!
//! ## Features
//!
//! - **Refreshable targets**: a lazily loaded slot reloaded according to a
//!   [`RefreshPolicy`] (check delay plus pluggable staleness predicate)
//! - **Last-good semantics**: a failed reload keeps the previous target
//! - **Pluggable loaders**: bean factory prototypes, repository records by
//!   primary key, recompiled scripts, or any closure
//! - **Scoped proxies**: one instance per session/request with explicit
//!   eviction and a distinct "scope not active" error
//! - **Forwarding adapters**: [`delegate_to_target!`] implements a
//!   capability trait by forwarding to the current target
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_target::{
//!     AlwaysStale, ManualClock, RefreshCheckDelay, RefreshableTargetSource, Refreshable,
//!     TargetSource,
//! };
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! struct Holder(u32);
//!
//! let created = Arc::new(AtomicU32::new(0));
//! let counter = created.clone();
//! let clock = ManualClock::new();
//!
//! let source = RefreshableTargetSource::builder()
//!     .name("holder")
//!     .loader(move || Ok(Arc::new(Holder(counter.fetch_add(1, Ordering::SeqCst) + 1))))
//!     .refresh_check_delay(RefreshCheckDelay::Every(Duration::from_millis(100)))
//!     .staleness(AlwaysStale)
//!     .clock(clock.clone())
//!     .build()
//!     .unwrap();
//!
//! let first = source.get_target().unwrap();
//! assert_eq!(first.0, 1);
//! assert_eq!(source.refresh_count(), 1);
//!
//! clock.advance(Duration::from_millis(10));
//! assert!(Arc::ptr_eq(&first, &source.get_target().unwrap()));
//!
//! clock.advance(Duration::from_millis(140));
//! assert_eq!(source.get_target().unwrap().0, 2);
//! assert_eq!(source.refresh_count(), 2);
//! ```
//!
//! ## Scoped Targets
//!
//! ```rust
//! use ferrous_target::{BeanCollection, MapScopeStore, ScopeContext, ScopedProxy};
//! use std::sync::Arc;
//!
//! #[derive(Debug, Default)]
//! struct Preferences {
//!     theme: String,
//! }
//!
//! let mut beans = BeanCollection::new();
//! beans.add_prototype("preferences", |_| Preferences::default());
//!
//! let sessions = Arc::new(MapScopeStore::session());
//! let preferences = ScopedProxy::<Preferences>::builder()
//!     .target_bean_name("preferences")
//!     .bean_factory(beans.build())
//!     .store(sessions.clone())
//!     .build()
//!     .unwrap();
//!
//! sessions.begin_scope("session-1");
//! let ctx = ScopeContext::new().with_session("session-1");
//! assert_eq!(preferences.invoke_in(&ctx, |p| p.theme.clone()).unwrap(), "");
//!
//! sessions.end_scope(&"session-1".into());
//! assert!(preferences.target_in(&ctx).unwrap_err().is_scope_not_active());
//! ```
//!
//! ## Feature flags
//!
//! - `async`: task-local [`ScopeContext`] via tokio; [`ScopedProxy`] then
//!   implements [`TargetSource`] and [`ScopedObject`] directly
//! - `config`: serde support for configuration types and [`JsonConfigSource`]

// Module declarations
pub mod clock;
pub mod collection;
pub mod config;
pub mod error;
pub mod key;
pub mod lifetime;
pub mod loaders;
pub mod observer;
pub mod policy;
pub mod provider;
pub mod proxy;
pub mod scope;
pub mod target_source;
pub mod traits;

// Internal modules
mod registration;

// Re-export core types
pub use clock::{Clock, ManualClock, SystemClock};
pub use collection::BeanCollection;
pub use config::{
    ConfigProvider, ConfigSource, ConfigValue, EnvironmentConfigSource, MapConfigSource,
    TargetSourceConfig,
};
#[cfg(feature = "config")]
pub use config::JsonConfigSource;
pub use error::{BoxError, TargetError, TargetResult};
pub use key::ScopeKey;
pub use lifetime::Lifetime;
pub use loaders::{
    BeanFactoryLoader, FileScriptSource, InMemoryScriptSource, Record, Repository,
    RepositoryLoader, RepositoryStaleness, ScriptCompiler, ScriptLoader, ScriptModified,
    ScriptSource, TargetLoader,
};
pub use observer::{LoggingObserver, MetricsObserver, TargetObserver};
pub use policy::{
    is_check_due, AlwaysStale, LoadInfo, MaxAge, NeverStale, RefreshCheckDelay, RefreshPolicy,
    Staleness,
};
pub use provider::BeanFactory;
pub use proxy::{BoundScopedProxy, ScopedProxy, ScopedProxyBuilder, TargetProxy};
pub use registration::AnyArc;
pub use scope::{MapScopeStore, ScopeContext, ScopeKind, ScopeStore};
pub use target_source::{
    HotSwappableTargetSource, PrototypeTargetSource, RefreshStats, RefreshableTargetSource,
    RefreshableTargetSourceBuilder, ScopedTargetSource, SingletonTargetSource, SlotState,
};
pub use traits::{Handle, Refreshable, ScopedObject, TargetSource};
