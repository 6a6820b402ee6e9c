//! Background autosave task for a [`super::Nap`].
//!
//! Mirrors the design's autosave thread, but instead of a liveness poll on
//! the main thread, the loop races a fixed-interval timer against a
//! [`CancellationToken`](tokio_util::sync::CancellationToken) that
//! [`super::Nap::close`] fires, so shutdown is immediate rather than waiting
//! out the interval.

use super::Nap;
use std::time::Duration;
use tokio::task::JoinHandle;

pub fn spawn(nap: Nap, interval: Duration, threshold: u64) -> JoinHandle<()> {
    let cancel = nap.cancellation_token();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    log::debug!("nap: autosave task cancelled");
                    break;
                }
                _ = tokio::time::sleep(interval) => {
                    match nap.write_count() {
                        Ok(count) if count >= threshold => {
                            if let Err(err) = nap.save() {
                                log::warn!("nap: autosave failed: {err}");
                            }
                        }
                        Ok(_) => {}
                        Err(err) => log::warn!("nap: autosave could not read write count: {err}"),
                    }
                }
            }
        }
    })
}
