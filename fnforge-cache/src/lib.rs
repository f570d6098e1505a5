//! Durable memoization for oracle responses
//!
//! A `MemoCache` maps canonical keys to JSON values for one namespace and
//! writes the whole table back to its `CacheStore` after every change.
//! Entries never expire; they are removed only by `evict` or `clear`.

pub mod error;
pub mod memo;
pub mod store;

pub use error::{CacheError, Result};
pub use memo::{CacheStats, MemoCache};
pub use store::{CacheStore, FileStore, MemoryStore, DEFAULT_CACHE_DIR};
