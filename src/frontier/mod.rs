//! The frontier: the queue of not-yet-downloaded [`Nurl`]s and the
//! traversal policy that orders it (§4.4).
//!
//! Lock order when this module is used alongside the global and per-domain
//! politeness gates: `global_polmut -> domain_polmut -> nap_lock ->
//! frontier_lock`.
//!
//! DFS pops the most recently added URL, BFS the oldest. Hybrid(h) is
//! primarily breadth-first: it head-pops while the candidate's `absdepth`
//! is within `h`, so that near-root URLs are explored broadly first. Once
//! the head is deeper than `h`, that head is demoted -- reinserted at the
//! front of the queue -- and the frontier falls back to a DFS tail-pop
//! instead, so a runaway-deep branch doesn't starve every other domain's
//! breadth. A demotion budget bounded by the queue's length at the start of
//! the call guarantees `get_tbd_nurl` always terminates even if every
//! remaining candidate is past the depth limit.

use crate::config::TraversalPolicy;
use crate::nap::{Nap, NapError};
use crate::nurl::{Nurl, Status};
use std::collections::VecDeque;
use std::sync::Mutex;

pub struct Frontier {
    nap: Nap,
    policy: TraversalPolicy,
    queue: Mutex<VecDeque<String>>,
}

impl Frontier {
    /// Starts a fresh frontier with an empty queue.
    pub fn new(nap: Nap, policy: TraversalPolicy) -> Self {
        Self { nap, policy, queue: Mutex::new(VecDeque::new()) }
    }

    /// Rebuilds the queue from every `NotDownloaded` record already in
    /// `nap`, for resuming an interrupted crawl. `InUse` records (left by a
    /// crash mid-fetch) should be repaired to `NotDownloaded` by the caller
    /// before this runs, via [`Nap::repair_in_use`].
    ///
    /// If `refetch_downloaded` is set (the CLI's `--use_cache=false`),
    /// records already marked `Downloaded` are reset and re-enqueued too,
    /// instead of being treated as cached and skipped.
    pub fn resume(nap: Nap, policy: TraversalPolicy, refetch_downloaded: bool) -> Result<Self, NapError> {
        let mut queue = VecDeque::new();
        for mut nurl in nap.snapshot_values()? {
            match nurl.status {
                Status::NotDownloaded => queue.push_back(nurl.url),
                Status::Downloaded if refetch_downloaded => {
                    nurl.status = Status::NotDownloaded;
                    let url = nurl.url.clone();
                    nap.set(&url, nurl)?;
                    queue.push_back(url);
                }
                _ => {}
            }
        }
        log::info!("frontier: resumed with {} pending url(s)", queue.len());
        Ok(Self { nap, policy, queue: Mutex::new(queue) })
    }

    /// Registers `nurl` if its URL is not already known, enqueuing it for
    /// traversal. A no-op if the URL was already seen (by any prior worker,
    /// crawl, or resume).
    pub fn add_nurl(&self, nurl: Nurl) -> Result<bool, NapError> {
        if self.nap.exists(&nurl.url)? {
            return Ok(false);
        }
        let url = nurl.url.clone();
        self.nap.set(&url, nurl)?;
        self.queue.lock().expect("frontier queue mutex poisoned").push_back(url);
        Ok(true)
    }

    /// Pops the next URL to crawl per the traversal policy, marking it
    /// `InUse` in the Nap before returning it. Returns `None` once the
    /// queue is drained.
    pub fn get_tbd_nurl(&self) -> Result<Option<Nurl>, NapError> {
        let start_len = self.queue.lock().expect("frontier queue mutex poisoned").len();
        let mut demotions = 0usize;

        loop {
            let url = {
                let mut queue = self.queue.lock().expect("frontier queue mutex poisoned");
                match self.policy {
                    TraversalPolicy::Bfs | TraversalPolicy::Hybrid(_) => queue.pop_front(),
                    TraversalPolicy::Dfs => queue.pop_back(),
                }
            };
            let Some(url) = url else { return Ok(None) };

            let mut nurl = self.nap.get(&url)?;
            if nurl.status != Status::NotDownloaded {
                // Stale entry: already claimed or resumed past. Drop it.
                continue;
            }

            if let TraversalPolicy::Hybrid(h) = self.policy {
                if nurl.absdepth > h && demotions < start_len {
                    demotions += 1;

                    // This head is too deep for the breadth-first phase:
                    // put it back at the front and fall back to a DFS
                    // tail-pop instead.
                    let tail_url = {
                        let mut queue = self.queue.lock().expect("frontier queue mutex poisoned");
                        queue.push_front(url.clone());
                        queue.pop_back()
                    };
                    let Some(tail_url) = tail_url else { continue };

                    if tail_url != url {
                        let mut tail_nurl = self.nap.get(&tail_url)?;
                        if tail_nurl.status != Status::NotDownloaded {
                            continue;
                        }
                        tail_nurl.status = Status::InUse;
                        self.nap.set(&tail_url, tail_nurl.clone())?;
                        return Ok(Some(tail_nurl));
                    }
                    // The queue held only this one (too-deep) entry: there
                    // is nothing to fall back to, so claim it anyway.
                }
            }

            nurl.status = Status::InUse;
            self.nap.set(&url, nurl.clone())?;
            return Ok(Some(nurl));
        }
    }

    /// Writes back a finished [`Nurl`] (status/finish already set by the
    /// worker pipeline's COMMIT stage).
    pub fn mark_nurl_complete(&self, nurl: &Nurl) -> Result<(), NapError> {
        self.nap.set(&nurl.url, nurl.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().expect("frontier queue mutex poisoned").is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.lock().expect("frontier queue mutex poisoned").len()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::time::Duration;

    fn nap(name: &str) -> Nap {
        let path = std::env::temp_dir().join(format!("napcrawl-frontier-test-{name}-{}.nap", std::process::id()));
        let _ = std::fs::remove_file(&path);
        Nap::open(path, Duration::from_secs(3600), 1_000_000).unwrap()
    }

    #[test]
    fn bfs_returns_oldest_first() {
        let frontier = Frontier::new(nap("bfs"), TraversalPolicy::Bfs);
        frontier.add_nurl(Nurl::new("https://a.edu/1".to_string())).unwrap();
        frontier.add_nurl(Nurl::new("https://a.edu/2".to_string())).unwrap();

        let first = frontier.get_tbd_nurl().unwrap().unwrap();
        assert_eq!(first.url, "https://a.edu/1");
    }

    #[test]
    fn dfs_returns_newest_first() {
        let frontier = Frontier::new(nap("dfs"), TraversalPolicy::Dfs);
        frontier.add_nurl(Nurl::new("https://a.edu/1".to_string())).unwrap();
        frontier.add_nurl(Nurl::new("https://a.edu/2".to_string())).unwrap();

        let first = frontier.get_tbd_nurl().unwrap().unwrap();
        assert_eq!(first.url, "https://a.edu/2");
    }

    #[test]
    fn duplicate_url_is_not_re_added() {
        let frontier = Frontier::new(nap("dup"), TraversalPolicy::Bfs);
        assert!(frontier.add_nurl(Nurl::new("https://a.edu/1".to_string())).unwrap());
        assert!(!frontier.add_nurl(Nurl::new("https://a.edu/1".to_string())).unwrap());
        assert_eq!(frontier.len(), 1);
    }

    #[test]
    fn hybrid_head_pops_while_within_depth() {
        let frontier = Frontier::new(nap("hybrid-head"), TraversalPolicy::Hybrid(2));
        frontier.add_nurl(Nurl::new("https://a.edu/1".to_string())).unwrap();
        frontier.add_nurl(Nurl::new("https://a.edu/2".to_string())).unwrap();

        let popped = frontier.get_tbd_nurl().unwrap().unwrap();
        assert_eq!(popped.url, "https://a.edu/1");
    }

    #[test]
    fn hybrid_demotes_overly_deep_branch_instead_of_starving_others() {
        let frontier = Frontier::new(nap("hybrid"), TraversalPolicy::Hybrid(1));

        let mut deep = Nurl::new("https://a.edu/deep".to_string());
        deep.absdepth = 5;
        frontier.add_nurl(deep).unwrap();
        frontier.add_nurl(Nurl::new("https://a.edu/shallow".to_string())).unwrap();

        // "deep" is at the head but exceeds the hybrid depth, so it is
        // demoted back to the front and the frontier falls back to a DFS
        // tail-pop, returning "shallow" instead.
        let popped = frontier.get_tbd_nurl().unwrap().unwrap();
        assert_eq!(popped.url, "https://a.edu/shallow");
    }

    #[test]
    fn get_tbd_nurl_terminates_even_if_everything_is_too_deep() {
        let frontier = Frontier::new(nap("hybrid-all-deep"), TraversalPolicy::Hybrid(1));
        let mut deep = Nurl::new("https://a.edu/deep".to_string());
        deep.absdepth = 5;
        frontier.add_nurl(deep).unwrap();

        let popped = frontier.get_tbd_nurl().unwrap();
        assert!(popped.is_some());
    }
}
