//! The expiring key/value cache engine and its background reaper.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::cancel::CancelToken;
use crate::clock::{nanos_since_epoch, Clock};
use crate::config::{CacheConfig, Expiry};
use crate::entry::{Entry, Expiration};
use crate::error::Error;
use crate::guarded::GuardedMap;

/// An in-process key/value cache with per-entry TTL.
///
/// Every read applies lazy expiration: an entry whose deadline has passed is
/// reported absent even if the background reaper has not yet removed it.
/// All operations take a single read or write scope on the underlying map,
/// so same-key writes are linearized and compound operations (`add`,
/// `replace`, `take`) are race-free.
///
/// The cache is cheaply clonable; clones share all state. Construction with
/// a positive cleanup interval spawns one background sweep task, stopped by
/// [`destroy`](Cache::destroy), by an externally supplied
/// [`CancelToken`](crate::CancelToken), or when the last handle is dropped.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use perishable::{Cache, Expiry};
///
/// #[tokio::main]
/// async fn main() {
///     let cache: Cache<String, String> = Cache::new(Expiry::In(Duration::from_secs(60)));
///
///     cache.set("user:123".to_string(), "John Doe".to_string());
///     assert_eq!(cache.get(&"user:123".to_string()).as_deref(), Some("John Doe"));
///
///     // Override the default TTL for one entry
///     cache.set_with("token".to_string(), "abc".to_string(), Expiry::In(Duration::from_secs(5)));
///
///     cache.destroy().await;
/// }
/// ```
pub struct Cache<K, V> {
    inner: Arc<CacheInner<K, V>>,
}

impl<K, V> Clone for Cache<K, V> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

struct CacheInner<K, V> {
    default_expiry: Expiry,
    clock: Arc<dyn Clock>,
    cancel: CancelToken,
    items: GuardedMap<K, Entry<V>>,
    /// Bumped once per completed background sweep; observers subscribe,
    /// nobody listening costs nothing.
    sweeps: watch::Sender<u64>,
    reaper: Mutex<Option<JoinHandle<()>>>,
}

impl<K, V> Drop for CacheInner<K, V> {
    fn drop(&mut self) {
        // Stop the reaper when the last handle goes away.
        self.cancel.cancel();
    }
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Creates a cache with the given default expiry and default
    /// configuration (10-minute sweep interval, system clock).
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime while the cleanup interval
    /// is positive; the background reaper needs a runtime to run on.
    pub fn new(default_expiry: Expiry) -> Self {
        Self::with_config(default_expiry, CacheConfig::default())
    }

    /// Creates a cache with a custom configuration.
    ///
    /// A cleanup interval of zero disables the background reaper entirely
    /// (and lifts the runtime requirement); expired entries are then only
    /// reclaimed lazily on reads or by [`delete_expired`](Cache::delete_expired).
    ///
    /// # Panics
    ///
    /// See [`new`](Cache::new).
    pub fn with_config(default_expiry: Expiry, config: CacheConfig) -> Self {
        let (sweeps, _) = watch::channel(0u64);
        let inner = Arc::new(CacheInner {
            default_expiry,
            clock: config.clock,
            cancel: config.cancel,
            items: GuardedMap::new(),
            sweeps,
            reaper: Mutex::new(None),
        });

        if config.cleanup_interval > Duration::ZERO {
            if tokio::runtime::Handle::try_current().is_err() {
                panic!(
                    "perishable::Cache requires a Tokio runtime to run its \
                     background reaper. Construct the cache from within a \
                     runtime, or disable sweeping with a zero cleanup interval."
                );
            }
            let handle = tokio::spawn(reap(Arc::downgrade(&inner), config.cleanup_interval));
            *inner.reaper.lock() = Some(handle);
        }

        Self { inner }
    }

    /// Cancels the reaper, clears all entries, and waits for the background
    /// task to finish.
    ///
    /// The cache is unusable in any meaningful sense afterwards: entries
    /// are gone and expired ones will no longer be swept automatically.
    pub async fn destroy(&self) {
        self.inner.cancel.cancel();
        self.inner.items.clear();
        let handle = self.inner.reaper.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

impl<K: Eq + Hash, V> Cache<K, V> {
    /// Returns the value stored under `key`, if present and not expired.
    ///
    /// Never mutates the cache.
    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.get_with_expiration(key).map(|(value, _)| value)
    }

    /// As [`get`](Cache::get), also reporting the entry's expiration.
    pub fn get_with_expiration(&self, key: &K) -> Option<(V, Expiration)>
    where
        V: Clone,
    {
        let now = self.inner.now_nanos();
        self.inner.items.read_scope(|m| {
            let entry = m.get(key)?;
            if entry.is_expired_at(now) {
                return None;
            }
            Some((entry.value().clone(), entry.expiration()))
        })
    }

    /// Whether a live entry is stored under `key`.
    pub fn has(&self, key: &K) -> bool {
        let now = self.inner.now_nanos();
        self.inner
            .items
            .read_scope(|m| m.get(key).is_some_and(|e| !e.is_expired_at(now)))
    }

    /// Stores `value` under `key` with the cache's default expiry,
    /// unconditionally replacing any existing entry, live or expired.
    pub fn set(&self, key: K, value: V) {
        self.set_with(key, value, Expiry::Default);
    }

    /// As [`set`](Cache::set) with an explicit expiry for this entry.
    pub fn set_with(&self, key: K, value: V, expiry: Expiry) {
        let expires_at = self.inner.resolve_expires_at(expiry);
        self.inner.items.store(key, Entry::new(value, expires_at));
    }

    /// Stores `value` under `key` only if no live entry exists there.
    ///
    /// Check and insert happen under one write scope, so concurrent `add`
    /// calls on the same key admit exactly one winner.
    pub fn add(&self, key: K, value: V) -> Result<(), Error> {
        self.add_with(key, value, Expiry::Default)
    }

    /// As [`add`](Cache::add) with an explicit expiry.
    pub fn add_with(&self, key: K, value: V, expiry: Expiry) -> Result<(), Error> {
        let now = self.inner.now_nanos();
        let expires_at = self.inner.resolve_expires_at(expiry);
        self.inner.items.write_scope(|m| {
            if m.get(&key).is_some_and(|e| !e.is_expired_at(now)) {
                return Err(Error::AlreadyExists);
            }
            m.insert(key, Entry::new(value, expires_at));
            Ok(())
        })
    }

    /// Stores `value` under `key` only if a live entry already exists
    /// there, resetting its expiry per this call's options.
    ///
    /// Atomic for the same reason as [`add`](Cache::add).
    pub fn replace(&self, key: K, value: V) -> Result<(), Error> {
        self.replace_with(key, value, Expiry::Default)
    }

    /// As [`replace`](Cache::replace) with an explicit expiry.
    pub fn replace_with(&self, key: K, value: V, expiry: Expiry) -> Result<(), Error> {
        let now = self.inner.now_nanos();
        let expires_at = self.inner.resolve_expires_at(expiry);
        self.inner.items.write_scope(|m| {
            if !m.get(&key).is_some_and(|e| !e.is_expired_at(now)) {
                return Err(Error::NotFound);
            }
            m.insert(key, Entry::new(value, expires_at));
            Ok(())
        })
    }

    /// Atomically removes and returns the entry under `key`.
    ///
    /// A logically expired entry is still removed physically but reported
    /// `None`. Of any number of concurrent takers, exactly one observes the
    /// value.
    pub fn take(&self, key: &K) -> Option<V> {
        let now = self.inner.now_nanos();
        self.inner.items.write_scope(|m| {
            let entry = m.remove(key)?;
            if entry.is_expired_at(now) {
                None
            } else {
                Some(entry.into_value())
            }
        })
    }

    /// Removes the entry under `key`, live or expired. Idempotent.
    pub fn delete(&self, key: &K) {
        self.inner.items.delete(key);
    }

    /// Removes every entry.
    pub fn delete_all(&self) {
        self.inner.items.clear();
    }

    /// Removes every expired entry in one pass, returning how many were
    /// removed. This is what the background reaper calls on each sweep.
    pub fn delete_expired(&self) -> usize {
        self.inner.delete_expired()
    }

    /// Number of physically present entries.
    ///
    /// May include expired entries that have not been swept yet; an exact
    /// live count would cost a full scan (use `items().len()` for that).
    pub fn len(&self) -> usize {
        self.inner.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.items.is_empty()
    }

    /// A snapshot of all live entries. Expired-but-unswept entries are
    /// filtered out regardless of whether the reaper has run.
    pub fn items(&self) -> HashMap<K, Entry<V>>
    where
        K: Clone,
        V: Clone,
    {
        let now = self.inner.now_nanos();
        self.inner.items.read_scope(|m| {
            m.iter()
                .filter(|(_, entry)| !entry.is_expired_at(now))
                .map(|(key, entry)| (key.clone(), entry.clone()))
                .collect()
        })
    }

    /// A receiver over the count of completed background sweeps, for test
    /// synchronization and observability. The counter advances once per
    /// sweep; subscribing is optional and missing a tick only skips
    /// intermediate counts.
    pub fn sweep_events(&self) -> watch::Receiver<u64> {
        self.inner.sweeps.subscribe()
    }

    /// The lifecycle token governing this cache's reaper.
    pub fn cancel_token(&self) -> CancelToken {
        self.inner.cancel.clone()
    }
}

impl<K: Eq + Hash, V> CacheInner<K, V> {
    fn now_nanos(&self) -> i64 {
        nanos_since_epoch(self.clock.now())
    }

    /// Resolves a requested expiry to an absolute deadline in nanoseconds,
    /// zero meaning "never".
    fn resolve_expires_at(&self, expiry: Expiry) -> i64 {
        let requested = match expiry {
            Expiry::Default => self.default_expiry,
            other => other,
        };
        let duration = match requested {
            // A cache whose default is itself `Default` resolves to a zero
            // duration: expired the moment it is written.
            Expiry::Default => Duration::ZERO,
            Expiry::Never => return 0,
            Expiry::In(d) => d,
            Expiry::At(deadline) => self.clock.until(deadline),
        };
        saturating_deadline(self.now_nanos(), duration)
    }

    fn delete_expired(&self) -> usize {
        let now = self.now_nanos();
        self.items.write_scope(|m| {
            let before = m.len();
            m.retain(|_, entry| !entry.is_expired_at(now));
            before - m.len()
        })
    }
}

/// `now + duration` in nanoseconds, clamped into the expiring range so a
/// huge TTL cannot overflow and a zero result cannot read as "never".
fn saturating_deadline(now: i64, duration: Duration) -> i64 {
    let total = now as i128 + duration.as_nanos() as i128;
    total.clamp(1, i64::MAX as i128) as i64
}

/// Background sweep loop: one per cache, lifecycle-bound to it.
///
/// Holds only a weak reference to the cache internals, so an abandoned
/// cache drops (its `Drop` cancels this task) instead of leaking. The
/// select is biased toward cancellation: a cancel arriving together with a
/// tick never produces an extra sweep.
async fn reap<K, V>(cache: Weak<CacheInner<K, V>>, interval: Duration)
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    let (clock, cancel) = {
        let Some(inner) = cache.upgrade() else { return };
        (Arc::clone(&inner.clock), inner.cancel.clone())
    };
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = clock.sleep(interval) => {}
        }
        let Some(inner) = cache.upgrade() else { return };
        let removed = inner.delete_expired();
        inner.sweeps.send_modify(|n| *n += 1);
        tracing::debug!(removed, "swept expired entries");
    }
}
