//! Pluggable time source.
//!
//! The cache never reads the system clock directly; everything time-related
//! goes through a [`Clock`], so tests can drive expiry and sweep scheduling
//! deterministically with a [`MockClock`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::watch;

/// A source of "now" and timed waits.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> SystemTime;

    /// A future that resolves once `duration` has elapsed on this clock.
    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>>;

    /// Time remaining until `deadline`, saturating to zero if it has passed.
    fn until(&self, deadline: SystemTime) -> Duration {
        deadline.duration_since(self.now()).unwrap_or(Duration::ZERO)
    }
}

/// Nanoseconds since the epoch for `t`, saturating at the `i64` range.
pub(crate) fn nanos_since_epoch(t: SystemTime) -> i64 {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_nanos()).unwrap_or(i64::MAX),
        Err(_) => 0,
    }
}

/// The real wall clock, waiting on the tokio timer.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        Box::pin(tokio::time::sleep(duration))
    }
}

/// A manually driven clock for tests.
///
/// Time only moves when [`advance`](MockClock::advance) is called; pending
/// `sleep` futures wake as soon as simulated time reaches their deadline.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
/// use perishable::{Clock, MockClock};
///
/// let clock = Arc::new(MockClock::new());
/// let before = clock.now();
/// clock.advance(Duration::from_secs(60));
/// assert_eq!(clock.now(), before + Duration::from_secs(60));
/// ```
#[derive(Debug)]
pub struct MockClock {
    now: watch::Sender<SystemTime>,
}

impl MockClock {
    /// A mock clock starting at the current wall time.
    pub fn new() -> Self {
        Self::at(SystemTime::now())
    }

    /// A mock clock starting at `start`.
    pub fn at(start: SystemTime) -> Self {
        let (now, _) = watch::channel(start);
        Self { now }
    }

    /// Moves simulated time forward, waking any sleeps whose deadline is
    /// reached.
    pub fn advance(&self, duration: Duration) {
        self.now.send_modify(|t| *t += duration);
    }

    /// Number of `sleep` futures currently pending on this clock.
    pub fn sleepers(&self) -> usize {
        self.now.receiver_count()
    }

    /// Waits until at least `n` sleepers are pending.
    ///
    /// Lets a test hand control to a task that is expected to call `sleep`
    /// before the test advances time past its deadline.
    pub async fn block_until(&self, n: usize) {
        while self.now.receiver_count() < n {
            tokio::task::yield_now().await;
        }
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> SystemTime {
        *self.now.borrow()
    }

    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        let mut ticks = self.now.subscribe();
        let deadline = *self.now.borrow() + duration;
        Box::pin(async move {
            loop {
                if *ticks.borrow_and_update() >= deadline {
                    return;
                }
                if ticks.changed().await.is_err() {
                    // Clock dropped while a sleeper is pending; time can no
                    // longer reach the deadline.
                    std::future::pending::<()>().await;
                }
            }
        })
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> SystemTime {
        (**self).now()
    }

    fn sleep(&self, duration: Duration) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        (**self).sleep(duration)
    }

    fn until(&self, deadline: SystemTime) -> Duration {
        (**self).until(deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_clock_starts_where_told() {
        let start = UNIX_EPOCH + Duration::from_secs(946_684_800); // 2000-01-01
        let clock = MockClock::at(start);
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn test_advance_moves_now() {
        let clock = MockClock::new();
        let before = clock.now();
        clock.advance(Duration::from_secs(90));
        assert_eq!(clock.now(), before + Duration::from_secs(90));
    }

    #[test]
    fn test_until_saturates_for_past_deadlines() {
        let clock = MockClock::at(UNIX_EPOCH + Duration::from_secs(100));
        assert_eq!(clock.until(UNIX_EPOCH + Duration::from_secs(160)), Duration::from_secs(60));
        assert_eq!(clock.until(UNIX_EPOCH + Duration::from_secs(40)), Duration::ZERO);
    }

    #[test]
    fn test_nanos_since_epoch() {
        assert_eq!(nanos_since_epoch(UNIX_EPOCH), 0);
        assert_eq!(
            nanos_since_epoch(UNIX_EPOCH + Duration::from_secs(1)),
            1_000_000_000
        );
    }

    #[tokio::test]
    async fn test_mock_sleep_wakes_on_advance() {
        let clock = Arc::new(MockClock::new());
        // Build the future first so its deadline is fixed before any advance.
        let sleeper = tokio::spawn(clock.sleep(Duration::from_secs(10)));

        // Not enough time yet
        clock.advance(Duration::from_secs(5));
        assert!(!sleeper.is_finished());

        clock.advance(Duration::from_secs(5));
        sleeper.await.expect("sleeper panicked");
    }

    #[tokio::test]
    async fn test_mock_sleep_zero_returns_immediately() {
        let clock = MockClock::new();
        clock.sleep(Duration::ZERO).await;
    }
}
