//! Target source implementations.
//!
//! - [`SingletonTargetSource`]: one fixed target
//! - [`RefreshableTargetSource`]: a lazily loaded target reloaded per [`RefreshPolicy`](crate::RefreshPolicy)
//! - [`HotSwappableTargetSource`]: a target replaced explicitly at runtime
//! - [`PrototypeTargetSource`]: a fresh target per call
//! - [`ScopedTargetSource`]: one target per scope instance

use std::sync::Arc;

use crate::error::TargetResult;
use crate::traits::TargetSource;

mod hot_swap;
mod prototype;
mod refreshable;
mod scoped;

pub use hot_swap::HotSwappableTargetSource;
pub use prototype::PrototypeTargetSource;
pub use refreshable::{RefreshStats, RefreshableTargetSource, RefreshableTargetSourceBuilder, SlotState};
pub use scoped::ScopedTargetSource;

/// Target source holding one fixed target.
#[derive(Debug)]
pub struct SingletonTargetSource<T: ?Sized> {
    target: Arc<T>,
}

impl<T: ?Sized> SingletonTargetSource<T> {
    pub fn new(target: Arc<T>) -> Self {
        Self { target }
    }

    pub fn target(&self) -> &Arc<T> {
        &self.target
    }
}

impl<T: ?Sized> Clone for SingletonTargetSource<T> {
    fn clone(&self) -> Self {
        Self {
            target: Arc::clone(&self.target),
        }
    }
}

impl<T: ?Sized + Send + Sync> TargetSource<T> for SingletonTargetSource<T> {
    fn get_target(&self) -> TargetResult<Arc<T>> {
        Ok(Arc::clone(&self.target))
    }

    fn is_static(&self) -> bool {
        true
    }
}
