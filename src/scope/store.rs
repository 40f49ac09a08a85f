//! Keyed storage of scoped instances.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::{Mutex, RwLock};

use crate::error::{TargetError, TargetResult};
use crate::key::ScopeKey;
use crate::registration::AnyArc;
use crate::scope::ScopeKind;

/// Storage backing scoped proxies.
///
/// A store holds at most one instance per `(scope key, name)` pair for as
/// long as the scope is active. Operations on a scope that is not active
/// fail with [`TargetError::ScopeNotActive`].
///
/// The contract is a plain keyed map with no transactional guarantees
/// beyond [`get_or_create`](Self::get_or_create), which implementations
/// should override to make creation atomic per scope.
pub trait ScopeStore: Send + Sync {
    /// Kind of scope this store serves.
    fn kind(&self) -> ScopeKind;

    /// Whether proxies over this store hand out reconnectable handles.
    fn is_persistent(&self) -> bool {
        false
    }

    fn is_active(&self, scope: &ScopeKey) -> bool;

    fn get(&self, scope: &ScopeKey, name: &str) -> TargetResult<Option<AnyArc>>;

    fn put(&self, scope: &ScopeKey, name: &str, instance: AnyArc) -> TargetResult<()>;

    /// Removes and returns the instance stored under `name`.
    fn remove(&self, scope: &ScopeKey, name: &str) -> TargetResult<Option<AnyArc>>;

    /// Returns the stored instance, creating and storing it if absent.
    fn get_or_create(
        &self,
        scope: &ScopeKey,
        name: &str,
        create: &mut dyn FnMut() -> TargetResult<AnyArc>,
    ) -> TargetResult<AnyArc> {
        if let Some(existing) = self.get(scope, name)? {
            return Ok(existing);
        }
        let created = create()?;
        self.put(scope, name, created.clone())?;
        Ok(created)
    }
}

/// One named instance of a scope. `creating` is held while its factory runs.
#[derive(Default)]
struct InstanceCell {
    instance: OnceLock<AnyArc>,
    creating: Mutex<()>,
}

type ScopeEntries = Arc<Mutex<HashMap<String, Arc<InstanceCell>>>>;

fn populated(entries: &ScopeEntries) -> usize {
    entries.lock().values().filter(|cell| cell.instance.get().is_some()).count()
}

/// In-memory scope store keeping one map per active scope.
///
/// Scopes are started with [`begin_scope`](Self::begin_scope) (for example
/// when a session is created) and torn down with
/// [`end_scope`](Self::end_scope), which drops every instance of that scope.
///
/// Each name in a scope has its own creation cell. The factory runs with
/// only that cell locked, so creating one scoped bean may resolve other
/// scoped beans of the same scope; callers racing on the same name wait
/// and share the single instance. A factory that resolves its own name
/// is a cycle and never completes.
///
/// # Examples
///
/// ```rust
/// use ferrous_target::{MapScopeStore, ScopeKey, ScopeStore};
/// use std::sync::Arc;
///
/// let store = MapScopeStore::session();
/// let key = ScopeKey::from("session-1");
///
/// assert!(store.get(&key, "cart").is_err()); // scope not active yet
///
/// store.begin_scope(key.clone());
/// assert!(store.get(&key, "cart").unwrap().is_none());
/// store.put(&key, "cart", Arc::new(Arc::new(3u32))).unwrap();
/// assert!(store.get(&key, "cart").unwrap().is_some());
///
/// assert_eq!(store.end_scope(&key), 1);
/// assert!(!store.is_active(&key));
/// ```
pub struct MapScopeStore {
    kind: ScopeKind,
    persistent: bool,
    scopes: RwLock<HashMap<ScopeKey, ScopeEntries>>,
}

impl MapScopeStore {
    pub fn new(kind: ScopeKind) -> Self {
        Self {
            kind,
            persistent: false,
            scopes: RwLock::new(HashMap::new()),
        }
    }

    pub fn session() -> Self {
        Self::new(ScopeKind::Session)
    }

    pub fn request() -> Self {
        Self::new(ScopeKind::Request)
    }

    /// Marks the store as persistent; proxies over it hand out handles
    /// that can be reconnected.
    pub fn with_persistence(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    /// Starts a scope. Returns `false` if it was already active.
    pub fn begin_scope(&self, scope: impl Into<ScopeKey>) -> bool {
        let scope = scope.into();
        let mut scopes = self.scopes.write();
        if scopes.contains_key(&scope) {
            return false;
        }
        tracing::debug!(kind = %self.kind, scope = %scope, "scope started");
        scopes.insert(scope, Arc::new(Mutex::new(HashMap::new())));
        true
    }

    /// Ends a scope and drops its instances. Returns how many were dropped.
    pub fn end_scope(&self, scope: &ScopeKey) -> usize {
        let removed = self.scopes.write().remove(scope);
        match removed {
            Some(entries) => {
                let count = populated(&entries);
                tracing::debug!(kind = %self.kind, scope = %scope, instances = count, "scope ended");
                count
            }
            None => 0,
        }
    }

    /// Keys of all active scopes, sorted.
    pub fn active_scopes(&self) -> Vec<ScopeKey> {
        let mut keys: Vec<ScopeKey> = self.scopes.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of instances in an active scope.
    pub fn instance_count(&self, scope: &ScopeKey) -> Option<usize> {
        let entries = self.scopes.read().get(scope).cloned();
        entries.map(|entries| populated(&entries))
    }

    fn entries(&self, scope: &ScopeKey) -> TargetResult<ScopeEntries> {
        self.scopes.read().get(scope).cloned().ok_or_else(|| {
            TargetError::scope_not_active(self.kind, format!("{} '{}' is not active", self.kind, scope))
        })
    }
}

impl ScopeStore for MapScopeStore {
    fn kind(&self) -> ScopeKind {
        self.kind
    }

    fn is_persistent(&self) -> bool {
        self.persistent
    }

    fn is_active(&self, scope: &ScopeKey) -> bool {
        self.scopes.read().contains_key(scope)
    }

    fn get(&self, scope: &ScopeKey, name: &str) -> TargetResult<Option<AnyArc>> {
        let cell = self.entries(scope)?.lock().get(name).cloned();
        Ok(cell.and_then(|cell| cell.instance.get().cloned()))
    }

    fn put(&self, scope: &ScopeKey, name: &str, instance: AnyArc) -> TargetResult<()> {
        self.entries(scope)?
            .lock()
            .insert(name.to_string(), Arc::new(InstanceCell {
                instance: OnceLock::from(instance),
                creating: Mutex::new(()),
            }));
        Ok(())
    }

    fn remove(&self, scope: &ScopeKey, name: &str) -> TargetResult<Option<AnyArc>> {
        let cell = self.entries(scope)?.lock().remove(name);
        Ok(cell.and_then(|cell| cell.instance.get().cloned()))
    }

    fn get_or_create(
        &self,
        scope: &ScopeKey,
        name: &str,
        create: &mut dyn FnMut() -> TargetResult<AnyArc>,
    ) -> TargetResult<AnyArc> {
        let cell = self.entries(scope)?
            .lock()
            .entry(name.to_string())
            .or_default()
            .clone();
        if let Some(existing) = cell.instance.get() {
            return Ok(existing.clone());
        }
        let _creating = cell.creating.lock();
        if let Some(existing) = cell.instance.get() {
            return Ok(existing.clone());
        }
        let created = create()?;
        Ok(cell.instance.get_or_init(|| created).clone())
    }
}

impl std::fmt::Debug for MapScopeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MapScopeStore")
            .field("kind", &self.kind)
            .field("persistent", &self.persistent)
            .field("active_scopes", &self.scopes.read().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn instance(v: u32) -> AnyArc {
        Arc::new(Arc::new(v))
    }

    #[test]
    fn test_begin_twice_is_noop() {
        let store = MapScopeStore::request();
        assert!(store.begin_scope("r"));
        store.put(&"r".into(), "x", instance(1)).unwrap();
        assert!(!store.begin_scope("r"));
        assert_eq!(store.instance_count(&"r".into()), Some(1));
    }

    #[test]
    fn test_get_or_create_creates_once() {
        let store = MapScopeStore::session();
        let key = ScopeKey::from("s");
        store.begin_scope(key.clone());
        let calls = AtomicU32::new(0);
        let mut create = || {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(instance(9))
        };
        let a = store.get_or_create(&key, "bean", &mut create).unwrap();
        let b = store.get_or_create(&key, "bean", &mut create).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_creation_may_populate_other_names_of_same_scope() {
        let store = MapScopeStore::session();
        let key = ScopeKey::from("s");
        store.begin_scope(key.clone());

        let outer = store
            .get_or_create(&key, "cart", &mut || {
                let inner = store.get_or_create(&key, "prefs", &mut || Ok(instance(1)))?;
                assert_eq!(store.instance_count(&key), Some(1));
                Ok(inner)
            })
            .unwrap();

        let prefs = store.get(&key, "prefs").unwrap().unwrap();
        assert!(Arc::ptr_eq(&outer, &prefs));
        assert_eq!(store.instance_count(&key), Some(2));
    }

    #[test]
    fn test_concurrent_creation_shares_one_instance() {
        let store = Arc::new(MapScopeStore::session());
        let key = ScopeKey::from("s");
        store.begin_scope(key.clone());
        let calls = Arc::new(AtomicU32::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let (store, key, calls) = (store.clone(), key.clone(), calls.clone());
                std::thread::spawn(move || {
                    store
                        .get_or_create(&key, "bean", &mut || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            std::thread::sleep(std::time::Duration::from_millis(5));
                            Ok(instance(7))
                        })
                        .unwrap()
                })
            })
            .collect();
        let instances: Vec<AnyArc> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(instances.iter().all(|i| Arc::ptr_eq(i, &instances[0])));
    }

    #[test]
    fn test_failed_creation_stores_nothing() {
        let store = MapScopeStore::session();
        let key = ScopeKey::from("s");
        store.begin_scope(key.clone());
        let mut failing = || Err(TargetError::NotFound("bean".into()));
        assert!(store.get_or_create(&key, "bean", &mut failing).is_err());
        assert!(store.get(&key, "bean").unwrap().is_none());
        assert_eq!(store.instance_count(&key), Some(0));
        assert!(store.remove(&key, "bean").unwrap().is_none());
    }

    #[test]
    fn test_inactive_scope_errors_carry_kind() {
        let store = MapScopeStore::new(ScopeKind::Custom("conversation"));
        match store.remove(&"c".into(), "x") {
            Err(TargetError::ScopeNotActive { kind, .. }) => {
                assert_eq!(kind, ScopeKind::Custom("conversation"))
            }
            other => panic!("unexpected: {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_active_scopes_sorted() {
        let store = MapScopeStore::session().with_persistence(true);
        store.begin_scope("b");
        store.begin_scope("a");
        assert!(store.is_persistent());
        assert_eq!(store.active_scopes(), vec![ScopeKey::from("a"), ScopeKey::from("b")]);
        assert_eq!(store.end_scope(&"zzz".into()), 0);
    }
}
