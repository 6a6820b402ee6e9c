//! Per-domain politeness gate (§4.1). A caller `acquire`s the gate before
//! fetching a URL on a domain and releases it when done; the release does
//! not unblock the next waiter immediately but schedules it for
//! `delay` later, so two fetches to the same domain are always spaced
//! `delay` apart regardless of how long the fetch itself took.
//!
//! The design calls for this without a background timer thread: releasing
//! records an "earliest next acquire" instant, and the next `acquire` sleeps
//! until that instant if it hasn't arrived yet.

use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::sync::Mutex as AsyncMutex;

/// A politeness gate for a single domain. One `PoliteMutex` is held per
/// domain by [`crate::robots::RobotsCache`]; callers serialize through it via
/// `acquire`/`release`.
pub struct PoliteMutex {
    delay: Duration,
    gate: AsyncMutex<()>,
    earliest_next: Mutex<Instant>,
}

impl PoliteMutex {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            gate: AsyncMutex::new(()),
            earliest_next: Mutex::new(Instant::now()),
        }
    }

    /// Blocks until this domain may be fetched again, then holds the gate.
    /// Returns a guard; dropping it (or calling [`PoliteMutex::release`]
    /// explicitly) arms the next waiter's delay.
    pub async fn acquire(&self) -> PoliteGuard<'_> {
        let permit = self.gate.lock().await;

        let wait_until = *self.earliest_next.lock().expect("polmut earliest_next mutex poisoned");
        let now = Instant::now();
        if wait_until > now {
            tokio::time::sleep(wait_until - now).await;
        }

        PoliteGuard { _permit: permit, mutex: self }
    }

    fn release(&self) {
        let mut earliest = self.earliest_next.lock().expect("polmut earliest_next mutex poisoned");
        *earliest = Instant::now() + self.delay;
    }
}

/// Held while a domain's fetch is in flight. On drop, arms the `delay`
/// before the next acquire on this domain is allowed to proceed.
pub struct PoliteGuard<'a> {
    _permit: tokio::sync::MutexGuard<'a, ()>,
    mutex: &'a PoliteMutex,
}

impl Drop for PoliteGuard<'_> {
    fn drop(&mut self) {
        self.mutex.release();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn second_acquire_waits_out_the_delay() {
        let mutex = PoliteMutex::new(Duration::from_millis(50));

        let start = Instant::now();
        {
            let _g = mutex.acquire().await;
        }
        let _g2 = mutex.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn first_acquire_does_not_block() {
        let mutex = PoliteMutex::new(Duration::from_secs(5));
        let start = Instant::now();
        let _g = mutex.acquire().await;
        assert!(start.elapsed() < Duration::from_millis(200));
    }
}
