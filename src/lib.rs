//! # Perishable
//!
//! An in-process, generic key/value cache with per-entry time-to-live.
//! A drop-in substitute for an external caching daemon when the application
//! and the cache share one process.
//!
//! ## Features
//!
//! - Generic over key and value types (`K: Eq + Hash`, any `V`)
//! - Lazy expiration: a read never returns a logically expired entry, even
//!   before it is physically removed
//! - Background reaper task per cache, lifecycle-bound and cancellable
//! - Atomic compound operations: `add` (insert-if-absent), `replace`
//!   (replace-if-present), `take` (load-and-delete)
//! - Pluggable clock for deterministic time in tests
//! - [`SetCache`] for membership-only use, and checked downcast helpers for
//!   caches of dynamically-typed values
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use perishable::{Cache, Expiry};
//!
//! #[tokio::main]
//! async fn main() {
//!     // Entries default to a one-minute TTL.
//!     let cache: Cache<String, String> = Cache::new(Expiry::In(Duration::from_secs(60)));
//!
//!     cache.set("session:1".to_string(), "alice".to_string());
//!     cache.set_with("pin".to_string(), "0000".to_string(), Expiry::Never);
//!
//!     assert!(cache.has(&"session:1".to_string()));
//!
//!     // Insert-if-absent; the second call reports the existing entry.
//!     cache.add("session:2".to_string(), "bob".to_string()).unwrap();
//!     assert!(cache.add("session:2".to_string(), "carol".to_string()).is_err());
//!
//!     // Tear down: stops the background reaper and clears all entries.
//!     cache.destroy().await;
//! }
//! ```
//!
//! ## Deterministic time
//!
//! Tests substitute a [`MockClock`] through [`CacheConfig::with_clock`] and
//! drive expiry with [`MockClock::advance`]; nothing in the cache reads the
//! system clock directly.

mod cache;
mod cancel;
mod cast;
mod clock;
mod config;
mod entry;
mod error;
mod guarded;
mod set;

pub use cache::Cache;
pub use cancel::CancelToken;
pub use cast::{any_value, get_cast, get_cast_cloned, try_cast, AnyValue};
pub use clock::{Clock, MockClock, SystemClock};
pub use config::{CacheConfig, Expiry, DEFAULT_CLEANUP_INTERVAL};
pub use entry::{Entry, Expiration};
pub use error::Error;
pub use guarded::{Guarded, GuardedMap};
pub use set::SetCache;
