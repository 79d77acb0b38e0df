//! Membership-only view over the cache engine.

use std::hash::Hash;

use crate::cache::Cache;
use crate::config::{CacheConfig, Expiry};
use crate::entry::Expiration;
use crate::error::Error;

/// A set of keys with per-member TTL: a [`Cache`] whose value type is `()`.
///
/// Pure façade — every method delegates to the corresponding cache
/// operation with a unit value, so all expiry, sweeping, and atomicity
/// semantics are the engine's.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use perishable::{Expiry, SetCache};
///
/// #[tokio::main]
/// async fn main() {
///     let seen: SetCache<String> = SetCache::new(Expiry::In(Duration::from_secs(300)));
///     seen.set("request:42".to_string());
///     assert!(seen.has(&"request:42".to_string()));
/// }
/// ```
#[derive(Clone)]
pub struct SetCache<K> {
    cache: Cache<K, ()>,
}

impl<K> SetCache<K>
where
    K: Eq + Hash + Send + Sync + 'static,
{
    /// See [`Cache::new`].
    pub fn new(default_expiry: Expiry) -> Self {
        Self { cache: Cache::new(default_expiry) }
    }

    /// See [`Cache::with_config`].
    pub fn with_config(default_expiry: Expiry, config: CacheConfig) -> Self {
        Self { cache: Cache::with_config(default_expiry, config) }
    }

    /// See [`Cache::destroy`].
    pub async fn destroy(&self) {
        self.cache.destroy().await;
    }
}

impl<K: Eq + Hash> SetCache<K> {
    /// Marks `key` as a member with the default expiry.
    pub fn set(&self, key: K) {
        self.cache.set(key, ());
    }

    pub fn set_with(&self, key: K, expiry: Expiry) {
        self.cache.set_with(key, (), expiry);
    }

    /// Adds `key` only if it is not already a live member.
    pub fn add(&self, key: K) -> Result<(), Error> {
        self.cache.add(key, ())
    }

    pub fn add_with(&self, key: K, expiry: Expiry) -> Result<(), Error> {
        self.cache.add_with(key, (), expiry)
    }

    /// Refreshes `key` only if it is a live member.
    pub fn replace(&self, key: K) -> Result<(), Error> {
        self.cache.replace(key, ())
    }

    pub fn replace_with(&self, key: K, expiry: Expiry) -> Result<(), Error> {
        self.cache.replace_with(key, (), expiry)
    }

    pub fn has(&self, key: &K) -> bool {
        self.cache.has(key)
    }

    /// When `key` expires, if it is a live member.
    pub fn get_expiration(&self, key: &K) -> Option<Expiration> {
        self.cache
            .get_with_expiration(key)
            .map(|((), expiration)| expiration)
    }

    pub fn delete(&self, key: &K) {
        self.cache.delete(key);
    }

    pub fn delete_all(&self) {
        self.cache.delete_all();
    }

    pub fn delete_expired(&self) -> usize {
        self.cache.delete_expired()
    }

    /// Physical member count; see [`Cache::len`] for the weak guarantee.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, MockClock};
    use std::sync::Arc;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    const MINUTE: Duration = Duration::from_secs(60);

    fn mock_set() -> (SetCache<String>, Arc<MockClock>) {
        let clock = Arc::new(MockClock::at(UNIX_EPOCH + Duration::from_secs(946_684_800)));
        let set = SetCache::with_config(
            Expiry::In(MINUTE),
            CacheConfig::default().with_clock(clock.clone() as Arc<dyn Clock>),
        );
        (set, clock)
    }

    #[tokio::test]
    async fn test_membership() {
        let (set, _clock) = mock_set();
        set.set("key1".into());
        set.set("key2".into());
        set.set("key3".into());

        assert_eq!(set.len(), 3);
        assert!(set.has(&"key1".into()));
        assert!(!set.has(&"key4".into()));

        set.delete(&"key1".into());
        assert!(!set.has(&"key1".into()));
        assert_eq!(set.len(), 2);
    }

    #[tokio::test]
    async fn test_members_expire() {
        let (set, clock) = mock_set();
        set.set("key1".into());

        clock.advance(Duration::from_secs(61));
        assert!(!set.has(&"key1".into()));
    }

    #[tokio::test]
    async fn test_add_and_replace() {
        let (set, _clock) = mock_set();
        assert_eq!(set.add("key1".into()), Ok(()));
        assert_eq!(set.add("key1".into()), Err(Error::AlreadyExists));

        assert_eq!(set.replace("key1".into()), Ok(()));
        assert_eq!(set.replace("key2".into()), Err(Error::NotFound));
    }

    #[tokio::test]
    async fn test_get_expiration() {
        let (set, clock) = mock_set();
        set.set("key1".into());
        set.set_with("key2".into(), Expiry::Never);

        assert_eq!(
            set.get_expiration(&"key1".into()),
            Some(Expiration::At(clock.now() + MINUTE))
        );
        assert_eq!(set.get_expiration(&"key2".into()), Some(Expiration::Never));
        assert_eq!(set.get_expiration(&"key3".into()), None);
    }

    #[tokio::test]
    async fn test_bulk_operations() {
        let (set, clock) = mock_set();
        set.set("key1".into());
        set.set("key2".into());
        clock.advance(Duration::from_secs(61));

        assert_eq!(set.delete_expired(), 2);
        assert!(set.is_empty());

        set.set("key1".into());
        set.delete_all();
        assert_eq!(set.len(), 0);
    }

    #[tokio::test]
    async fn test_destroy() {
        let (set, _clock) = mock_set();
        set.set("key1".into());
        set.destroy().await;
        assert_eq!(set.len(), 0);
    }
}
