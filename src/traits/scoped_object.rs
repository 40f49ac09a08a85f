//! Control interface exposed by scoped proxies.

use crate::error::TargetResult;
use crate::scope::ScopeKind;

/// Serializable description of a scoped proxy.
///
/// A persistent handle can be used to rebuild an equivalent proxy with
/// [`ScopedProxy::reconnect`](crate::ScopedProxy::reconnect); the rebuilt
/// proxy resolves to the same instance as the original.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Handle {
    target_bean_name: String,
    scope_name: String,
    kind: ScopeKind,
    persistent: bool,
}

impl Handle {
    pub fn new(
        target_bean_name: impl Into<String>,
        scope_name: impl Into<String>,
        kind: ScopeKind,
        persistent: bool,
    ) -> Self {
        Self {
            target_bean_name: target_bean_name.into(),
            scope_name: scope_name.into(),
            kind,
            persistent,
        }
    }

    pub fn target_bean_name(&self) -> &str {
        &self.target_bean_name
    }

    pub fn scope_name(&self) -> &str {
        &self.scope_name
    }

    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent
    }
}

/// Narrow lifecycle interface implemented by scoped proxies.
///
/// [`remove`](Self::remove) is the only explicit way to end the life of a
/// scoped instance before its scope ends: the next call through the proxy,
/// in the same scope, creates a new instance.
pub trait ScopedObject: Send + Sync {
    /// Name of the prototype bean backing the proxy.
    fn target_bean_name(&self) -> &str;

    /// Attribute name the instance is stored under inside its scope.
    fn scope_name(&self) -> &str;

    fn handle(&self) -> Handle;

    /// Evicts the current instance from its scope.
    fn remove(&self) -> TargetResult<()>;
}
