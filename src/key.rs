//! Scope key types.

use std::fmt;
use std::sync::Arc;

/// Identifier of one live scope instance.
///
/// A scope key names a concrete session or request (for example an HTTP
/// session id). Together with a bean name it addresses at most one
/// instance in a [`ScopeStore`](crate::ScopeStore).
///
/// Keys are cheap to clone; the string is shared.
///
/// # Examples
///
/// ```rust
/// use ferrous_target::ScopeKey;
///
/// let a = ScopeKey::from("session-1");
/// let b = ScopeKey::new(String::from("session-1"));
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "session-1");
/// assert_eq!(a.to_string(), "session-1");
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeKey(Arc<str>);

impl ScopeKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(Arc::from(key.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScopeKey({:?})", &*self.0)
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScopeKey {
    fn from(key: &str) -> Self {
        Self(Arc::from(key))
    }
}

impl From<String> for ScopeKey {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}

impl AsRef<str> for ScopeKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_key_equality_and_hash() {
        let mut set = HashSet::new();
        set.insert(ScopeKey::from("a"));
        set.insert(ScopeKey::from(String::from("a")));
        set.insert(ScopeKey::from("b"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_key_debug_format() {
        let key = ScopeKey::from("req-7");
        assert_eq!(format!("{:?}", key), "ScopeKey(\"req-7\")");
    }
}
