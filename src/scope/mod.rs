//! Scopes: lifetime boundaries for scoped target instances.
//!
//! A scope instance (one HTTP session, one request) is identified by a
//! [`ScopeKey`](crate::ScopeKey). Instances live in a [`ScopeStore`] keyed by
//! `(scope key, bean name)`. Which scope a call belongs to is passed
//! explicitly as a [`ScopeContext`], or, with the `async` feature, taken
//! from a task-local context entered with [`ScopeContext::scope`].

use std::fmt;

mod context;
mod store;

pub use context::ScopeContext;
pub use store::{MapScopeStore, ScopeStore};

/// Kind of scope a scoped proxy is bound to.
///
/// # Examples
///
/// ```rust
/// use ferrous_target::ScopeKind;
///
/// assert_eq!(ScopeKind::Session.to_string(), "session");
/// assert_eq!(ScopeKind::Custom("conversation").to_string(), "conversation");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    /// One instance per request
    Request,
    /// One instance per session
    Session,
    /// Application-defined scope
    Custom(&'static str),
}

impl ScopeKind {
    pub fn name(&self) -> &'static str {
        match self {
            ScopeKind::Request => "request",
            ScopeKind::Session => "session",
            ScopeKind::Custom(name) => name,
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
