//! Error types for target sources, scopes and proxies.

use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

use crate::scope::ScopeKind;

/// Boxed error returned by loaders, repositories and script compilers.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Target source errors
///
/// Represents the failure kinds a caller of a target source or proxy can
/// observe. Load failures, inactive scopes and configuration mistakes are
/// distinct variants so callers can tell them apart.
///
/// # Examples
///
/// ```rust
/// use ferrous_target::{BeanCollection, TargetError};
///
/// let factory = BeanCollection::new().build();
/// match factory.get_bean::<String>("missing") {
///     Err(TargetError::NotFound(name)) => assert_eq!(name, "missing"),
///     _ => unreachable!(),
/// }
/// ```
///
/// ```rust
/// use ferrous_target::{TargetError, ScopeKind};
///
/// let not_active = TargetError::scope_not_active(ScopeKind::Session, "no session bound");
/// assert!(not_active.is_scope_not_active());
/// assert!(!not_active.is_load_failure());
/// println!("Error: {}", not_active);
/// ```
#[derive(Debug, Clone, Error)]
pub enum TargetError {
    /// Bean name or primary key does not resolve
    #[error("Target not found: {0}")]
    NotFound(String),

    /// The loader could not produce an object
    #[error("Failed to load target '{target}': {source}")]
    LoadFailed {
        target: String,
        #[source]
        source: Arc<dyn StdError + Send + Sync + 'static>,
    },

    /// A scoped proxy was invoked outside the lifetime of its scope
    #[error("Scope not active: {kind} ({detail})")]
    ScopeNotActive { kind: ScopeKind, detail: String },

    /// A required collaborator or setting is missing or inconsistent
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Scoped proxies only accept prototype targets
    #[error("Target bean '{0}' is a singleton; scoped proxies require a prototype")]
    SingletonNotAccepted(String),

    /// A handle cannot be used to reconnect a proxy
    #[error("Handle not persistent: {0}")]
    HandleNotPersistent(String),

    /// Stored instance has a different type than requested
    #[error("Type mismatch for '{name}': expected {expected}")]
    TypeMismatch { name: String, expected: &'static str },
}

impl TargetError {
    /// Wraps a loader error for the named target.
    pub fn load(target: impl Into<String>, source: impl Into<BoxError>) -> Self {
        let boxed: BoxError = source.into();
        TargetError::LoadFailed {
            target: target.into(),
            source: Arc::from(boxed),
        }
    }

    pub fn scope_not_active(kind: ScopeKind, detail: impl Into<String>) -> Self {
        TargetError::ScopeNotActive {
            kind,
            detail: detail.into(),
        }
    }

    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        TargetError::InvalidConfiguration(message.into())
    }

    /// True for errors raised because no scope was bound to the call.
    pub fn is_scope_not_active(&self) -> bool {
        matches!(self, TargetError::ScopeNotActive { .. })
    }

    /// True for errors raised while producing a target object.
    pub fn is_load_failure(&self) -> bool {
        matches!(self, TargetError::LoadFailed { .. } | TargetError::NotFound(_))
    }

    pub fn is_invalid_configuration(&self) -> bool {
        matches!(
            self,
            TargetError::InvalidConfiguration(_) | TargetError::SingletonNotAccepted(_)
        )
    }
}

/// Result type for target source operations
///
/// A convenience alias for `Result<T, TargetError>` used throughout
/// ferrous-target.
pub type TargetResult<T> = Result<T, TargetError>;
