//! Type-narrowing helpers for caches of dynamically-typed values.
//!
//! A `Cache<K, AnyValue>` can hold values of mixed types; these helpers sit
//! on top of the ordinary read path and attempt a checked downcast to a
//! requested static type. They never mutate the cache: a failed narrowing
//! leaves the entry exactly as it was.

use std::any::Any;
use std::hash::Hash;
use std::sync::Arc;

use crate::cache::Cache;

/// A shared, dynamically-typed cache value.
pub type AnyValue = Arc<dyn Any + Send + Sync>;

/// Wraps a value for storage in an `AnyValue` cache.
pub fn any_value<T: Any + Send + Sync>(value: T) -> AnyValue {
    Arc::new(value)
}

/// Retrieves the value under `key` narrowed to `T`.
///
/// `None` when the key is absent, expired, or holds a different type.
pub fn get_cast<T, K>(cache: &Cache<K, AnyValue>, key: &K) -> Option<Arc<T>>
where
    T: Any + Send + Sync,
    K: Eq + Hash,
{
    cache.get(key)?.downcast::<T>().ok()
}

/// Whether `key` holds a live value of type `T`.
pub fn try_cast<T, K>(cache: &Cache<K, AnyValue>, key: &K) -> bool
where
    T: Any + Send + Sync,
    K: Eq + Hash,
{
    get_cast::<T, K>(cache, key).is_some()
}

/// As [`get_cast`], returning an owned copy of the value.
pub fn get_cast_cloned<T, K>(cache: &Cache<K, AnyValue>, key: &K) -> Option<T>
where
    T: Any + Send + Sync + Clone,
    K: Eq + Hash,
{
    get_cast::<T, K>(cache, key).map(|v| (*v).clone())
}
