//! Nap: the persistent, thread-safe map of [`Nurl`]s and their dedup buckets
//! (§3, §4.2 of the design).
//!
//! A single [`std::sync::Mutex`] guards `dict`, `exdict`, `smdict` and
//! `writecnt` together; every internal helper takes the already-acquired
//! guard instead of re-locking, so multi-step transactions (exact/similarity
//! bucket claims, the get-then-set pattern used by [`crate::frontier`]) stay
//! atomic without a recursive lock.

mod autosave;
mod snapshot;

use crate::nurl::{Nurl, Status};
use crate::weburl;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub use snapshot::Bucket;

#[derive(Debug, Error)]
pub enum NapError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Encode(#[from] rmp_serde::encode::Error),
    #[error(transparent)]
    Decode(#[from] rmp_serde::decode::Error),
    #[error(transparent)]
    Url(#[from] weburl::WebUrlError),
    #[error("the Nap's lock was poisoned by a panicking holder")]
    LockPoisoned,
}

/// Outcome of trying to claim an exact- or similarity-content dedup bucket.
#[derive(Debug, Eq, PartialEq)]
pub enum BucketClaim {
    /// `self` is the first to register this content; it becomes the master.
    Master,
    /// Another `Nurl` already holds the master slot for this content.
    Follower { master_hash: String },
}

struct NapState {
    dict: HashMap<String, Nurl>,
    exdict: HashMap<String, Bucket>,
    smdict: HashMap<u32, Bucket>,
    writecnt: u64,
}

/// The persistent, thread-safe map of Nurls. Cheaply cloneable; clones share
/// the same underlying store and autosave task.
#[derive(Clone)]
pub struct Nap {
    state: Arc<Mutex<NapState>>,
    fname: PathBuf,
    closed: Arc<AtomicBool>,
    cancel: CancellationToken,
    autosave_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Nap {
    /// Opens (or creates) the Nap backed by `fname`, loading any existing
    /// snapshot and starting the background autosave task.
    pub fn open(
        fname: impl Into<PathBuf>,
        autosave_interval: Duration,
        autosave_threshold: u64,
    ) -> Result<Self, NapError> {
        let fname = fname.into();
        let loaded = snapshot::load(&fname)?.unwrap_or_default();

        log::info!(
            "nap: init {}, save_interval={:?}, threshold={}",
            fname.display(),
            autosave_interval,
            autosave_threshold
        );

        let state = Arc::new(Mutex::new(NapState {
            dict: loaded.dict,
            exdict: loaded.exdict,
            smdict: loaded.smdict,
            writecnt: 0,
        }));

        let nap = Self {
            state,
            fname,
            closed: Arc::new(AtomicBool::new(false)),
            cancel: CancellationToken::new(),
            autosave_handle: Arc::new(Mutex::new(None)),
        };

        let handle = autosave::spawn(nap.clone(), autosave_interval, autosave_threshold);
        *nap.autosave_handle.lock().expect("autosave handle mutex poisoned") = Some(handle);

        Ok(nap)
    }

    fn lock(&self) -> Result<MutexGuard<'_, NapState>, NapError> {
        self.state.lock().map_err(|_| NapError::LockPoisoned)
    }

    /// Returns the Nurl for `url`, creating and inserting a default
    /// `NotDownloaded` record for the normalized URL if one is not already
    /// present. The returned value is a snapshot copy; write it back with
    /// [`Nap::set`] to persist any mutation.
    pub fn get(&self, url: &str) -> Result<Nurl, NapError> {
        let normalized = weburl::normalize(url)?.to_string();
        let mut guard = self.lock()?;
        if let Some(existing) = guard.dict.get(&crate::hashing::urlhash(&normalized)) {
            return Ok(existing.clone());
        }
        let fresh = Nurl::new(normalized);
        guard.dict.insert(fresh.hash.clone(), fresh.clone());
        Ok(fresh)
    }

    /// Replaces the record for `url`'s normalized hash, incrementing the
    /// write counter that drives autosave.
    pub fn set(&self, url: &str, nurl: Nurl) -> Result<(), NapError> {
        let normalized = weburl::normalize(url)?.to_string();
        let hash = crate::hashing::urlhash(&normalized);
        let mut guard = self.lock()?;
        guard.dict.insert(hash, nurl);
        guard.writecnt += 1;
        Ok(())
    }

    /// Membership test by normalized hash.
    pub fn exists(&self, url: &str) -> Result<bool, NapError> {
        let normalized = weburl::normalize(url)?.to_string();
        let guard = self.lock()?;
        Ok(guard.dict.contains_key(&crate::hashing::urlhash(&normalized)))
    }

    /// Atomically checks the exact-content dedup bucket for `exhash`,
    /// claiming the master slot if none exists yet. `candidate_hash` is the
    /// urlhash of the `Nurl` attempting the claim.
    pub fn claim_exact_bucket(&self, exhash: &str, candidate_hash: &str) -> Result<BucketClaim, NapError> {
        let mut guard = self.lock()?;
        match guard.exdict.get_mut(exhash) {
            Some(bucket) => {
                if bucket.master == candidate_hash {
                    Ok(BucketClaim::Master)
                } else {
                    bucket.followers.push(candidate_hash.to_string());
                    Ok(BucketClaim::Follower { master_hash: bucket.master.clone() })
                }
            }
            None => {
                guard.exdict.insert(
                    exhash.to_string(),
                    Bucket { master: candidate_hash.to_string(), followers: Vec::new() },
                );
                Ok(BucketClaim::Master)
            }
        }
    }

    /// Atomically scans `smdict` for a bucket whose key is within
    /// `threshold` Hamming distance of `fingerprint`, claiming a new bucket
    /// if none is found.
    pub fn claim_similar_bucket(
        &self,
        fingerprint: u32,
        candidate_hash: &str,
        threshold: u32,
    ) -> Result<BucketClaim, NapError> {
        let mut guard = self.lock()?;
        for (key, bucket) in guard.smdict.iter_mut() {
            if crate::hashing::hamming_distance(*key, fingerprint) <= threshold {
                if bucket.master == candidate_hash {
                    return Ok(BucketClaim::Master);
                }
                bucket.followers.push(candidate_hash.to_string());
                return Ok(BucketClaim::Follower { master_hash: bucket.master.clone() });
            }
        }
        guard.smdict.insert(
            fingerprint,
            Bucket { master: candidate_hash.to_string(), followers: Vec::new() },
        );
        Ok(BucketClaim::Master)
    }

    /// Writes the full store to `<fname>.tmp` then atomically renames it over
    /// `fname`. A no-op (trivial success) if nothing has changed since the
    /// last save.
    pub fn save(&self) -> Result<bool, NapError> {
        let mut guard = self.lock()?;
        if guard.writecnt == 0 {
            return Ok(true);
        }
        snapshot::save(&self.fname, &guard.dict, &guard.exdict, &guard.smdict)?;
        guard.writecnt = 0;
        log::info!("nap: saved to {}", self.fname.display());
        Ok(true)
    }

    /// Repairs any `InUse` record (left over from a crash) to
    /// `NotDownloaded`. Returns the repaired value if a change was made.
    pub fn repair_in_use(&self, url: &str) -> Result<Option<Nurl>, NapError> {
        let mut nurl = self.get(url)?;
        if nurl.status == Status::InUse {
            nurl.status = Status::NotDownloaded;
            self.set(url, nurl.clone())?;
            return Ok(Some(nurl));
        }
        Ok(None)
    }

    /// Stops autosave, then attempts [`Nap::save`] up to `max_retries + 1`
    /// times, returning the final success/failure.
    pub async fn close(&self, max_retries: u32) -> bool {
        log::info!("nap: received close()");
        self.cancel.cancel();
        if let Some(handle) = self.autosave_handle.lock().expect("autosave handle mutex poisoned").take() {
            let _ = handle.await;
        }
        log::info!("nap: joined autosave task");

        let mut ok = false;
        for _ in 0..=max_retries {
            if matches!(self.save(), Ok(true)) {
                ok = true;
                break;
            }
        }
        self.closed.store(true, Ordering::SeqCst);
        log::info!("nap: closed (final_save={ok})");
        ok
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub(crate) fn write_count(&self) -> Result<u64, NapError> {
        Ok(self.lock()?.writecnt)
    }

    /// Returns every stored Nurl, used by `frontier` on resume and by
    /// `report`.
    pub fn snapshot_values(&self) -> Result<Vec<Nurl>, NapError> {
        Ok(self.lock()?.dict.values().cloned().collect())
    }

    pub fn path(&self) -> &Path {
        &self.fname
    }
}

/// Reads every stored `Nurl` from the snapshot at `path` without opening a
/// full [`Nap`] (no autosave task, no write lock held afterward). Used by
/// `napreport`, which only ever reads a completed or in-progress crawl's
/// state.
pub fn read_only_snapshot(path: impl AsRef<Path>) -> Result<Vec<Nurl>, NapError> {
    let loaded = snapshot::load(path.as_ref())?.unwrap_or_default();
    Ok(loaded.dict.into_values().collect())
}

#[cfg(test)]
mod test {
    use super::*;
    use tempfile_path::temp_path;

    mod tempfile_path {
        use std::path::PathBuf;
        use std::sync::atomic::{AtomicU64, Ordering};

        static COUNTER: AtomicU64 = AtomicU64::new(0);

        pub fn temp_path(name: &str) -> PathBuf {
            let n = COUNTER.fetch_add(1, Ordering::SeqCst);
            std::env::temp_dir().join(format!("napcrawl-test-{name}-{n}-{}.nap", std::process::id()))
        }
    }

    /// Removes `path` and its `.tmp` sibling when dropped, regardless of
    /// whether the test panics partway through.
    fn cleanup_guard(path: PathBuf) -> impl Drop {
        scopeguard::guard(path, |path| {
            let _ = std::fs::remove_file(&path);
            let _ = std::fs::remove_file(format!("{}.tmp", path.display()));
        })
    }

    #[tokio::test]
    async fn get_creates_default_and_set_persists_mutation() {
        let path = temp_path("get-set");
        let _cleanup = cleanup_guard(path.clone());
        let nap = Nap::open(&path, Duration::from_secs(3600), 1_000_000).unwrap();

        let mut n = nap.get("https://a.edu/").unwrap();
        assert_eq!(n.status, Status::NotDownloaded);
        n.status = Status::Downloaded;
        nap.set("https://a.edu/", n).unwrap();

        let reloaded = nap.get("https://a.edu/").unwrap();
        assert_eq!(reloaded.status, Status::Downloaded);
        nap.close(0).await;
    }

    #[tokio::test]
    async fn exact_bucket_first_writer_wins_master() {
        let path = temp_path("exact-bucket");
        let _cleanup = cleanup_guard(path.clone());
        let nap = Nap::open(&path, Duration::from_secs(3600), 1_000_000).unwrap();

        let claim1 = nap.claim_exact_bucket("deadbeef", "hash-a").unwrap();
        assert_eq!(claim1, BucketClaim::Master);
        let claim2 = nap.claim_exact_bucket("deadbeef", "hash-b").unwrap();
        assert_eq!(claim2, BucketClaim::Follower { master_hash: "hash-a".to_string() });

        nap.close(0).await;
    }

    #[tokio::test]
    async fn snapshot_round_trips_through_save_and_reload() {
        let path = temp_path("roundtrip");
        let _cleanup = cleanup_guard(path.clone());
        {
            let nap = Nap::open(&path, Duration::from_secs(3600), 1_000_000).unwrap();
            let n = nap.get("https://a.edu/x").unwrap();
            nap.set("https://a.edu/x", n).unwrap();
            nap.claim_exact_bucket("abc123", "hash-a").unwrap();
            assert!(nap.save().unwrap());
            nap.close(0).await;
        }
        {
            let nap = Nap::open(&path, Duration::from_secs(3600), 1_000_000).unwrap();
            assert!(nap.exists("https://a.edu/x").unwrap());
            nap.close(0).await;
        }
    }
}
