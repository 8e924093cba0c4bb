//! Bounded polling for asynchronously rendered structure
//!
//! Device pages render their tables non-deterministically; per-series timing
//! varies. All structural waits go through [`TableWaiter`] so retry semantics
//! live in one place instead of ad hoc sleeps at every call site. The poll
//! interval is a fixed render wait and is never timeout-scaled.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

#[derive(Debug, Clone, Copy)]
pub struct TableWaiter {
    max_attempts: u32,
    interval: Duration,
}

impl TableWaiter {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }

    /// Poll `probe` until it reports `expected`, sleeping `interval` between
    /// attempts. Returns the last observed count after exhausting attempts
    /// and never errors. The caller decides whether a shortfall is fatal,
    /// since partial structure can still support degraded extraction.
    pub async fn await_count<F, Fut>(&self, mut probe: F, expected: usize) -> usize
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = usize>,
    {
        let mut observed = 0;

        for attempt in 1..=self.max_attempts {
            observed = probe().await;
            if observed == expected {
                debug!(
                    "Structure ready: {} element(s) after {} attempt(s)",
                    observed, attempt
                );
                return observed;
            }

            debug!(
                "Attempt {}/{}: saw {} of {} expected element(s)",
                attempt, self.max_attempts, observed, expected
            );

            if attempt < self.max_attempts {
                tokio::time::sleep(self.interval).await;
            }
        }

        warn!(
            "Structure incomplete after {} attempts: saw {} of {}",
            self.max_attempts, observed, expected
        );
        observed
    }
}

impl Default for TableWaiter {
    fn default() -> Self {
        // 5 x 3s covers the slowest observed dashboard render.
        Self::new(5, Duration::from_secs(3))
    }
}
