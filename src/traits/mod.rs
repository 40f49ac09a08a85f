//! Core traits shared by target sources and proxies.

mod scoped_object;
mod target_source;

pub use scoped_object::{Handle, ScopedObject};
pub use target_source::{Refreshable, TargetSource};
