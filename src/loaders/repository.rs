//! Reloading targets from a persistent store by primary key.

use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{BoxError, TargetError, TargetResult};
use crate::loaders::TargetLoader;
use crate::policy::{LoadInfo, Staleness};

/// A stored value together with its version.
///
/// The version is whatever the store uses to detect changes: a row
/// version, an update counter, a modification timestamp.
#[derive(Debug)]
pub struct Record<T: ?Sized> {
    pub value: Arc<T>,
    pub version: u64,
}

impl<T: ?Sized> Record<T> {
    pub fn new(value: Arc<T>, version: u64) -> Self {
        Self { value, version }
    }
}

impl<T: ?Sized> Clone for Record<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            version: self.version,
        }
    }
}

/// Persistent store lookups used by [`RepositoryLoader`].
///
/// `Ok(None)` means the key does not resolve; errors are I/O or driver
/// failures.
pub trait Repository<K, T: ?Sized>: Send + Sync {
    fn find(&self, key: &K) -> Result<Option<Record<T>>, BoxError>;

    /// Current version of the record, without loading it.
    fn version(&self, key: &K) -> Result<Option<u64>, BoxError> {
        Ok(self.find(key)?.map(|record| record.version))
    }
}

/// Loads a target from a [`Repository`] by primary key.
///
/// A key that no longer resolves fails with [`TargetError::NotFound`];
/// a refreshable source keeps serving the previously loaded value.
pub struct RepositoryLoader<K, T: ?Sized> {
    repository: Arc<dyn Repository<K, T>>,
    key: K,
    loaded_version: Arc<Mutex<Option<u64>>>,
}

impl<K, T> RepositoryLoader<K, T>
where
    K: Clone + Debug + Send + Sync + 'static,
    T: ?Sized + Send + Sync + 'static,
{
    pub fn new(repository: Arc<dyn Repository<K, T>>, key: K) -> Self {
        Self {
            repository,
            key,
            loaded_version: Arc::new(Mutex::new(None)),
        }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    /// Version of the last successfully loaded record.
    pub fn loaded_version(&self) -> Option<u64> {
        *self.loaded_version.lock()
    }

    /// Staleness predicate reporting a change once the stored version
    /// differs from the loaded one.
    pub fn staleness(&self) -> RepositoryStaleness<K, T> {
        RepositoryStaleness {
            repository: Arc::clone(&self.repository),
            key: self.key.clone(),
            loaded_version: Arc::clone(&self.loaded_version),
        }
    }
}

impl<K, T> TargetLoader<T> for RepositoryLoader<K, T>
where
    K: Clone + Debug + Send + Sync + 'static,
    T: ?Sized + Send + Sync + 'static,
{
    fn load(&self) -> TargetResult<Arc<T>> {
        match self.repository.find(&self.key) {
            Ok(Some(record)) => {
                *self.loaded_version.lock() = Some(record.version);
                Ok(record.value)
            }
            Ok(None) => Err(TargetError::NotFound(format!("key {:?}", self.key))),
            Err(e) => Err(TargetError::load(self.describe(), e)),
        }
    }

    fn describe(&self) -> String {
        format!("repository key {:?}", self.key)
    }
}

/// Staleness predicate produced by [`RepositoryLoader::staleness`].
///
/// A vanished key counts as stale so the next refresh surfaces the
/// `NotFound` error. A failing version probe counts as fresh.
pub struct RepositoryStaleness<K, T: ?Sized> {
    repository: Arc<dyn Repository<K, T>>,
    key: K,
    loaded_version: Arc<Mutex<Option<u64>>>,
}

impl<K, T> Staleness<T> for RepositoryStaleness<K, T>
where
    K: Debug + Send + Sync,
    T: ?Sized,
{
    fn is_stale(&self, _current: &T, _info: &LoadInfo) -> bool {
        match self.repository.version(&self.key) {
            Ok(Some(version)) => *self.loaded_version.lock() != Some(version),
            Ok(None) => true,
            Err(e) => {
                tracing::warn!(key = ?self.key, error = %e, "version probe failed; keeping current target");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Instant;

    struct Table(Mutex<HashMap<u32, Record<String>>>);

    impl Repository<u32, String> for Table {
        fn find(&self, key: &u32) -> Result<Option<Record<String>>, BoxError> {
            Ok(self.0.lock().get(key).cloned())
        }
    }

    fn table() -> Arc<Table> {
        let mut rows = HashMap::new();
        rows.insert(1, Record::new(Arc::new("one".to_string()), 1));
        Arc::new(Table(Mutex::new(rows)))
    }

    #[test]
    fn test_staleness_follows_version() {
        let table = table();
        let loader: RepositoryLoader<u32, String> = RepositoryLoader::new(table.clone(), 1);
        let staleness = loader.staleness();
        let value = loader.load().unwrap();
        let now = Instant::now();
        let info = LoadInfo { loaded_at: now, now, refresh_count: 1 };

        assert_eq!(loader.loaded_version(), Some(1));
        assert!(!staleness.is_stale(&value, &info));

        table.0.lock().insert(1, Record::new(Arc::new("uno".to_string()), 2));
        assert!(staleness.is_stale(&value, &info));
        assert_eq!(loader.load().unwrap().as_str(), "uno");
        assert!(!staleness.is_stale(&value, &info));
    }

    #[test]
    fn test_missing_key_is_not_found() {
        let loader: RepositoryLoader<u32, String> = RepositoryLoader::new(table(), 9);
        match loader.load() {
            Err(TargetError::NotFound(what)) => assert_eq!(what, "key 9"),
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(loader.loaded_version(), None);
    }
}
