//! Cancellable lifecycle handle shared between a cache and its reaper.

use std::sync::Arc;

use tokio::sync::watch;

/// A clonable cancellation signal.
///
/// All clones observe the same state: once any clone calls
/// [`cancel`](CancelToken::cancel), every pending and future
/// [`cancelled`](CancelToken::cancelled) wait resolves. Cancellation is
/// one-way and permanent.
#[derive(Debug, Clone)]
pub struct CancelToken {
    flag: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    /// A fresh, uncancelled token.
    pub fn new() -> Self {
        let (flag, _) = watch::channel(false);
        Self { flag: Arc::new(flag) }
    }

    /// Fires the signal. Idempotent.
    pub fn cancel(&self) {
        self.flag.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.flag.borrow()
    }

    /// Resolves once the token is cancelled; immediately if it already is.
    pub async fn cancelled(&self) {
        let mut rx = self.flag.subscribe();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            // The sender lives inside self, so changed() cannot fail while
            // we are borrowed from it.
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
