//! Scoped-access wrappers around shared mutable state.
//!
//! `Guarded<T>` is the cache's single ownership boundary for mutable data:
//! the value inside can only be touched through `read_scope`/`write_scope`
//! closures, so every multi-step sequence expressed as one closure is atomic
//! with respect to every other scope. `GuardedMap` layers the usual map
//! conveniences on top, each implemented as exactly one scope call.

use std::collections::HashMap;
use std::hash::Hash;

use parking_lot::RwLock;

/// A value that can only be accessed while holding its lock, through a
/// caller-supplied closure.
///
/// Multiple `read_scope` closures may run concurrently; a `write_scope`
/// closure is exclusive. The lock is released on every exit path, including
/// a panic inside the closure.
#[derive(Debug, Default)]
pub struct Guarded<T> {
    inner: RwLock<T>,
}

impl<T> Guarded<T> {
    pub fn new(value: T) -> Self {
        Self { inner: RwLock::new(value) }
    }

    /// Runs `f` with a shared view of the value.
    pub fn read_scope<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.read())
    }

    /// Runs `f` with an exclusive, mutable view of the value.
    ///
    /// Any read-check-then-write sequence that must be atomic belongs in a
    /// single call to this method, never in a read scope followed by a
    /// separate write scope.
    pub fn write_scope<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.inner.write())
    }

    /// Consumes the wrapper and returns the value.
    pub fn into_inner(self) -> T {
        self.inner.into_inner()
    }
}

/// A mutex-guarded `HashMap` with single-call convenience operations.
///
/// Knows nothing about expiration; it is a generic `K -> V` container
/// reusable for any mapping that needs serialized access.
#[derive(Debug)]
pub struct GuardedMap<K, V> {
    map: Guarded<HashMap<K, V>>,
}

impl<K, V> Default for GuardedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> GuardedMap<K, V> {
    pub fn new() -> Self {
        Self { map: Guarded::new(HashMap::new()) }
    }

    /// Runs `f` with a shared view of the whole map.
    pub fn read_scope<R>(&self, f: impl FnOnce(&HashMap<K, V>) -> R) -> R {
        self.map.read_scope(f)
    }

    /// Runs `f` with an exclusive view of the whole map.
    pub fn write_scope<R>(&self, f: impl FnOnce(&mut HashMap<K, V>) -> R) -> R {
        self.map.write_scope(f)
    }

    /// Number of entries currently present.
    pub fn len(&self) -> usize {
        self.map.read_scope(|m| m.len())
    }

    pub fn is_empty(&self) -> bool {
        self.map.read_scope(|m| m.is_empty())
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.map.write_scope(|m| m.clear());
    }
}

impl<K: Eq + Hash, V> GuardedMap<K, V> {
    /// Inserts `value` under `key`, replacing any prior entry.
    pub fn store(&self, key: K, value: V) {
        self.map.write_scope(|m| {
            m.insert(key, value);
        });
    }

    /// Returns a clone of the value under `key`, if present.
    pub fn load(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.map.read_scope(|m| m.get(key).cloned())
    }

    pub fn contains(&self, key: &K) -> bool {
        self.map.read_scope(|m| m.contains_key(key))
    }

    /// Removes the entry under `key` if present. Idempotent.
    pub fn delete(&self, key: &K) {
        self.map.write_scope(|m| {
            m.remove(key);
        });
    }

    /// Atomically removes and returns the entry under `key`.
    ///
    /// Exactly one of any number of concurrent callers observes the value;
    /// the rest get `None`.
    pub fn load_and_delete(&self, key: &K) -> Option<V> {
        self.map.write_scope(|m| m.remove(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_read_and_write_scopes() {
        let guarded = Guarded::new(vec![1, 2, 3]);
        let sum: i32 = guarded.read_scope(|v| v.iter().sum());
        assert_eq!(sum, 6);

        guarded.write_scope(|v| v.push(4));
        assert_eq!(guarded.read_scope(|v| v.len()), 4);
        assert_eq!(guarded.into_inner(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_store_and_load() {
        let map = GuardedMap::new();
        map.store("key1", 1);

        assert_eq!(map.load(&"key1"), Some(1));
        assert_eq!(map.load(&"key2"), None);
        assert!(map.contains(&"key1"));
        assert!(!map.contains(&"key2"));
    }

    #[test]
    fn test_store_overwrites() {
        let map = GuardedMap::new();
        map.store("key1", 1);
        map.store("key1", 2);

        assert_eq!(map.load(&"key1"), Some(2));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let map = GuardedMap::new();
        map.store("key1", 1);

        map.delete(&"key1");
        assert_eq!(map.load(&"key1"), None);
        map.delete(&"key1"); // no-op
        assert!(map.is_empty());
    }

    #[test]
    fn test_load_and_delete() {
        let map = GuardedMap::new();
        map.store("key1", 1);

        assert_eq!(map.load_and_delete(&"key1"), Some(1));
        assert_eq!(map.load_and_delete(&"key1"), None);
        assert_eq!(map.len(), 0);
    }

    #[test]
    fn test_clear() {
        let map = GuardedMap::new();
        map.store("key1", 1);
        map.store("key2", 2);

        map.clear();
        assert!(map.is_empty());
    }

    #[test]
    fn test_concurrent_writes() {
        let map = Arc::new(GuardedMap::new());
        let mut handles = vec![];

        // 10 threads, each writing 100 distinct keys
        for thread_id in 0..10 {
            let map = Arc::clone(&map);
            handles.push(thread::spawn(move || {
                for i in 0..100 {
                    map.store(format!("thread{}:key{}", thread_id, i), i);
                }
            }));
        }
        for handle in handles {
            handle.join().expect("thread panicked");
        }

        assert_eq!(map.len(), 1000);
    }

    #[test]
    fn test_write_scope_makes_check_then_insert_atomic() {
        let map = Arc::new(GuardedMap::new());
        let mut handles = vec![];

        // All threads race an insert-if-absent on one key; exactly one wins.
        for thread_id in 0..10 {
            let map = Arc::clone(&map);
            handles.push(thread::spawn(move || {
                map.write_scope(|m| {
                    if m.contains_key("contested") {
                        false
                    } else {
                        m.insert("contested".to_string(), thread_id);
                        true
                    }
                })
            }));
        }

        let winners = handles
            .into_iter()
            .map(|h| h.join().expect("thread panicked"))
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_concurrent_load_and_delete_single_winner() {
        let map = Arc::new(GuardedMap::new());
        map.store("key1", 1);

        let mut handles = vec![];
        for _ in 0..8 {
            let map = Arc::clone(&map);
            handles.push(thread::spawn(move || map.load_and_delete(&"key1").is_some()));
        }

        let winners = handles
            .into_iter()
            .map(|h| h.join().expect("thread panicked"))
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
