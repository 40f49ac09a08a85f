//! Explicit scope context passed with every scope-aware call.

use crate::error::{TargetError, TargetResult};
use crate::key::ScopeKey;
use crate::scope::ScopeKind;

#[cfg(feature = "async")]
tokio::task_local! {
    static CURRENT_SCOPE: ScopeContext;
}

/// The scope instances a call belongs to.
///
/// A context maps each [`ScopeKind`] to the key of the live scope for the
/// current unit of work, e.g. the session id and the request id of an
/// incoming HTTP request. Scoped proxies use it to pick the instance to
/// forward to; a missing binding is reported as
/// [`TargetError::ScopeNotActive`].
///
/// # Examples
///
/// ```rust
/// use ferrous_target::{ScopeContext, ScopeKey, ScopeKind};
///
/// let ctx = ScopeContext::new()
///     .with_session("session-1")
///     .with_request("req-42");
///
/// assert_eq!(ctx.key_for(ScopeKind::Session), Some(&ScopeKey::from("session-1")));
/// assert_eq!(ctx.key_for(ScopeKind::Request), Some(&ScopeKey::from("req-42")));
/// assert!(ctx.require(ScopeKind::Custom("conversation")).is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeContext {
    bindings: Vec<(ScopeKind, ScopeKey)>,
}

impl ScopeContext {
    pub fn new() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }

    /// Binds `kind` to `key`, replacing any previous binding of that kind.
    pub fn with(mut self, kind: ScopeKind, key: impl Into<ScopeKey>) -> Self {
        let key = key.into();
        match self.bindings.iter_mut().find(|(k, _)| *k == kind) {
            Some(binding) => binding.1 = key,
            None => self.bindings.push((kind, key)),
        }
        self
    }

    pub fn with_request(self, key: impl Into<ScopeKey>) -> Self {
        self.with(ScopeKind::Request, key)
    }

    pub fn with_session(self, key: impl Into<ScopeKey>) -> Self {
        self.with(ScopeKind::Session, key)
    }

    pub fn key_for(&self, kind: ScopeKind) -> Option<&ScopeKey> {
        self.bindings.iter().find(|(k, _)| *k == kind).map(|(_, key)| key)
    }

    /// Like [`key_for`](Self::key_for) but fails with `ScopeNotActive`.
    pub fn require(&self, kind: ScopeKind) -> TargetResult<&ScopeKey> {
        self.key_for(kind).ok_or_else(|| {
            TargetError::scope_not_active(kind, format!("no {} bound to the current call", kind))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(feature = "async")]
impl ScopeContext {
    /// Runs `future` with this context as the task-local current scope.
    ///
    /// ```rust
    /// # use ferrous_target::ScopeContext;
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let ctx = ScopeContext::new().with_session("s-1");
    /// let seen = ctx.clone().scope(async { ScopeContext::current() }).await;
    /// assert_eq!(seen, Some(ctx));
    /// assert_eq!(ScopeContext::current(), None);
    /// # }
    /// ```
    pub async fn scope<F: std::future::Future>(self, future: F) -> F::Output {
        CURRENT_SCOPE.scope(self, future).await
    }

    /// Synchronous counterpart of [`scope`](Self::scope).
    pub fn sync_scope<R>(self, f: impl FnOnce() -> R) -> R {
        CURRENT_SCOPE.sync_scope(self, f)
    }

    /// The context entered by the enclosing `scope`/`sync_scope`, if any.
    pub fn current() -> Option<ScopeContext> {
        CURRENT_SCOPE.try_with(|ctx| ctx.clone()).ok()
    }

    /// Key of the current scope of `kind`, or `ScopeNotActive`.
    pub fn current_key(kind: ScopeKind) -> TargetResult<ScopeKey> {
        CURRENT_SCOPE
            .try_with(|ctx| ctx.require(kind).cloned())
            .unwrap_or_else(|_| {
                Err(TargetError::scope_not_active(kind, "no scope context entered"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rebinding_replaces_key() {
        let ctx = ScopeContext::new().with_request("r1").with_request("r2");
        assert_eq!(ctx.key_for(ScopeKind::Request), Some(&ScopeKey::from("r2")));
    }

    #[test]
    fn test_require_missing_kind_is_scope_not_active() {
        let ctx = ScopeContext::new();
        assert!(ctx.is_empty());
        let err = ctx.require(ScopeKind::Session).unwrap_err();
        assert!(err.is_scope_not_active());
        assert!(err.to_string().contains("session"));
    }

    #[cfg(feature = "async")]
    #[test]
    fn test_sync_scope_sets_current() {
        let ctx = ScopeContext::new().with_request("r1");
        let key = ctx.sync_scope(|| ScopeContext::current_key(ScopeKind::Request));
        assert_eq!(key.unwrap(), ScopeKey::from("r1"));
        assert!(ScopeContext::current_key(ScopeKind::Request).is_err());
    }
}
