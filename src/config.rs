//! Cache construction options and per-write expiry options.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::cancel::CancelToken;
use crate::clock::{Clock, SystemClock};

/// How often the background reaper sweeps, unless overridden.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Expiry requested for an individual write, or configured as the
/// cache-wide default.
///
/// `Default` and `Never` are sentinels distinct from every positive
/// duration. A duration of zero is legal and means the entry expires at
/// the moment it is written — it is never treated as permanent.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Expiry {
    /// Use the cache's configured default expiry.
    #[default]
    Default,
    /// Never expire.
    Never,
    /// Expire after the given duration.
    In(Duration),
    /// Expire at the given instant, converted via the cache's clock at call
    /// time.
    At(SystemTime),
}

/// Configuration for a [`Cache`](crate::Cache).
///
/// Consuming-builder style: start from `CacheConfig::default()` and chain
/// `with_*` calls.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use perishable::CacheConfig;
///
/// let config = CacheConfig::default()
///     .with_cleanup_interval(Duration::from_secs(30));
/// ```
#[derive(Clone)]
pub struct CacheConfig {
    /// Interval between background sweeps. Zero disables the reaper
    /// entirely; expired entries are then only reclaimed lazily or by
    /// manual `delete_expired` calls.
    pub cleanup_interval: Duration,
    /// Time source consulted for every expiry decision.
    pub clock: Arc<dyn Clock>,
    /// Lifecycle cancellation source. Supplying one ties the reaper's
    /// lifetime to an external signal in addition to `destroy`.
    pub cancel: CancelToken,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            clock: Arc::new(SystemClock),
            cancel: CancelToken::new(),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the background sweep interval. Zero disables sweeping.
    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    /// Substitutes the time source, typically a
    /// [`MockClock`](crate::MockClock) in tests.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Overrides the lifecycle cancellation source.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }
}

impl std::fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheConfig")
            .field("cleanup_interval", &self.cleanup_interval)
            .field("cancel", &self.cancel)
            .finish_non_exhaustive()
    }
}
