//! Concrete record bindings.

pub mod cache_entries;
pub mod dynamic;

pub use cache_entries::{CacheEntries, CacheEntry, CacheEntryBinding};
pub use dynamic::{DynamicBinding, DynamicRow};
