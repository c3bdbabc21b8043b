//! Caller-side cancellation.
//!
//! A [`CancelToken`] is shared between the caller and every blocking point of
//! a request: rate-limit sleeps, token refresh waits, backoff sleeps and the
//! HTTP exchange itself. Cancelling drops whatever future is in flight, which
//! aborts the underlying connection.

use crate::error::{RedditClientError, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Clone, Debug)]
pub struct CancelToken {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Cancel every operation running under this token, now and later.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolves once the token is cancelled.
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        loop {
            if *receiver.borrow_and_update() {
                return;
            }
            if receiver.changed().await.is_err() {
                // the sender lives as long as `self`; this is unreachable
                std::future::pending::<()>().await;
            }
        }
    }

    /// Drive `future` to completion unless the token is cancelled first.
    pub async fn run<F: Future>(&self, future: F) -> Result<F::Output> {
        if self.is_cancelled() {
            return Err(RedditClientError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(RedditClientError::Cancelled),
            output = future => Ok(output),
        }
    }

    pub async fn sleep(&self, duration: Duration) -> Result<()> {
        if duration.is_zero() {
            return if self.is_cancelled() {
                Err(RedditClientError::Cancelled)
            } else {
                Ok(())
            };
        }
        self.run(tokio::time::sleep(duration)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn cancelled_token_interrupts_sleep() {
        let token = CancelToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let started = Instant::now();
        let result = token.sleep(Duration::from_secs(30)).await;
        assert!(matches!(result, Err(RedditClientError::Cancelled)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn run_passes_output_through() {
        let token = CancelToken::new();
        assert_eq!(token.run(async { 7 }).await.unwrap(), 7);
        token.cancel();
        assert!(token.run(async { 7 }).await.is_err());
    }
}
