//! The stored unit: a value paired with an absolute expiration instant.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Expiration reported for a stored entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiration {
    /// The entry never expires.
    Never,
    /// The entry expires at the given instant.
    At(SystemTime),
}

/// A stored value and its expiration deadline.
///
/// `expires_at` is absolute nanoseconds since `UNIX_EPOCH`; zero or
/// negative means the entry never expires. Entries are immutable once
/// stored — overwriting a key swaps in a whole new entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<V> {
    value: V,
    expires_at: i64,
}

impl<V> Entry<V> {
    pub(crate) fn new(value: V, expires_at: i64) -> Self {
        Self { value, expires_at }
    }

    /// The stored value.
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Consumes the entry and returns the stored value.
    pub fn into_value(self) -> V {
        self.value
    }

    /// The entry's expiration deadline.
    pub fn expiration(&self) -> Expiration {
        if self.expires_at > 0 {
            Expiration::At(UNIX_EPOCH + Duration::from_nanos(self.expires_at as u64))
        } else {
            Expiration::Never
        }
    }

    /// Whether the entry is expired at `now` (nanoseconds since the epoch).
    ///
    /// The boundary is inclusive: an entry whose deadline equals `now` is
    /// already expired.
    pub(crate) fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at > 0 && now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permanent_entry_never_expires() {
        let entry = Entry::new("value", 0);
        assert!(!entry.is_expired_at(i64::MAX));
        assert_eq!(entry.expiration(), Expiration::Never);

        let entry = Entry::new("value", -1);
        assert!(!entry.is_expired_at(i64::MAX));
        assert_eq!(entry.expiration(), Expiration::Never);
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let entry = Entry::new(1, 1_000);
        assert!(!entry.is_expired_at(999));
        assert!(entry.is_expired_at(1_000));
        assert!(entry.is_expired_at(1_001));
    }

    #[test]
    fn test_expiration_instant_round_trips() {
        let entry = Entry::new((), 1_500_000_000);
        match entry.expiration() {
            Expiration::At(t) => {
                assert_eq!(t, UNIX_EPOCH + Duration::from_nanos(1_500_000_000));
            }
            Expiration::Never => panic!("expected a deadline"),
        }
    }

    #[test]
    fn test_value_accessors() {
        let entry = Entry::new(String::from("val1"), 42);
        assert_eq!(entry.value(), "val1");
        assert_eq!(entry.into_value(), "val1");
    }
}
