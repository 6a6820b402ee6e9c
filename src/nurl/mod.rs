//! Node URL: a URL plus all crawl-time metadata (§3 of the design).

use crate::hashing::urlhash;
use crate::weburl::{self, same_scheme_host, WebUrlError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::Display;

/// Lifecycle of a [`Nurl`] inside the [`Nap`](crate::nap::Nap).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display)]
pub enum Status {
    NotDownloaded,
    InUse,
    Downloaded,
}

/// Terminal classification recorded once a worker finishes with a [`Nurl`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, Display)]
pub enum Finish {
    Unset,
    Ok,
    Bad,
    LowInfoPre,
    LowInfoPost,
    TooExact,
    TooSimilar,
    NotAllowed,
    Redirect,
    Sifted,
    CacheError,
}

/// Where a [`Nurl`] was discovered from. Sitemap-derived entries carry the
/// robots.txt URL that announced them rather than a hash, since that URL is
/// never itself stored as a `Nurl` (see the `parent` field's design note).
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub enum Parent {
    Seed,
    Robots(String),
    Nurl(String),
}

/// A URL plus its crawl-graph metadata. See module docs and the design's §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Nurl {
    pub url: String,
    pub hash: String,
    pub parent: Parent,
    pub status: Status,
    pub finish: Finish,
    pub absdepth: u64,
    pub reldepth: u64,
    pub monodepth: u64,
    pub dupdepth: u64,
    pub words: HashMap<String, u32>,
    pub links: Vec<String>,
    pub exhash: Option<String>,
    pub smhash: Option<u32>,
}

impl Nurl {
    /// Creates a fresh, not-yet-downloaded `Nurl` for a URL that has already
    /// been normalized.
    pub fn new(normalized_url: String) -> Self {
        let hash = urlhash(&normalized_url);
        Self {
            url: normalized_url,
            hash,
            parent: Parent::Seed,
            status: Status::NotDownloaded,
            finish: Finish::Unset,
            absdepth: 0,
            reldepth: 0,
            monodepth: 0,
            dupdepth: 0,
            words: HashMap::new(),
            links: Vec::new(),
            exhash: None,
            smhash: None,
        }
    }

    /// Normalizes `raw` and builds a fresh `Nurl` from it.
    pub fn from_raw(raw: &str) -> Result<Self, WebUrlError> {
        Ok(Self::new(weburl::normalize(raw)?.to_string()))
    }

    /// Sets `self`'s parent to `parent` and recomputes `absdepth`, `reldepth`,
    /// `monodepth` and `dupdepth` deterministically, per the design's
    /// depth-computation sub-algorithm.
    ///
    /// If `self` and `parent` are not in the same scheme+host, or `self`'s
    /// path is not prefixed by `parent`'s path, all three relative depths are
    /// reset to 0 (only `absdepth` always increases).
    pub fn set_parent(&mut self, parent: &Nurl) {
        self.parent = Parent::Nurl(parent.hash.clone());
        self.absdepth = parent.absdepth + 1;

        let (child_url, parent_url) = match (
            url::Url::parse(&self.url),
            url::Url::parse(&parent.url),
        ) {
            (Ok(c), Ok(p)) => (c, p),
            _ => {
                self.reldepth = 0;
                self.monodepth = 0;
                self.dupdepth = 0;
                return;
            }
        };

        if !same_scheme_host(&child_url, &parent_url) || !child_url.path().starts_with(parent_url.path()) {
            self.reldepth = 0;
            self.monodepth = 0;
            self.dupdepth = 0;
            return;
        }

        let delta = weburl::path_slash_count(&child_url) as i64 - weburl::path_slash_count(&parent_url) as i64;

        if delta == 0 {
            self.reldepth = 0;
            self.monodepth = 0;
            self.dupdepth = parent.dupdepth + 1;
        } else if delta >= 1 {
            self.reldepth = if delta > 1 { 0 } else { parent.reldepth + 1 };
            self.monodepth = parent.monodepth + 1;
            self.dupdepth = 0;
        } else {
            self.reldepth = 0;
            self.monodepth = 0;
            self.dupdepth = 0;
        }
    }

    /// Marks this `Nurl` with its sitemap parent, used when robots.txt
    /// announces sitemap URLs (§4.3).
    pub fn set_robots_parent(&mut self, robots_url: String) {
        self.parent = Parent::Robots(robots_url);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn child_of(parent: &Nurl, url: &str) -> Nurl {
        let mut child = Nurl::new(url.to_string());
        child.set_parent(parent);
        child
    }

    #[test]
    fn depths_are_zero_for_fresh_nurl() {
        let n = Nurl::new("https://a.edu/".to_string());
        assert_eq!(n.absdepth, 0);
        assert_eq!(n.reldepth, 0);
        assert_eq!(n.monodepth, 0);
        assert_eq!(n.dupdepth, 0);
    }

    #[test]
    fn one_level_deeper_increments_reldepth_and_monodepth() {
        let parent = Nurl::new("https://a.edu/x".to_string());
        let child = child_of(&parent, "https://a.edu/x/y");
        assert_eq!(child.absdepth, 1);
        assert_eq!(child.reldepth, 1);
        assert_eq!(child.monodepth, 1);
        assert_eq!(child.dupdepth, 0);
    }

    #[test]
    fn two_levels_deeper_resets_reldepth_but_keeps_monodepth() {
        let parent = Nurl::new("https://a.edu/x".to_string());
        let child = child_of(&parent, "https://a.edu/x/y/z");
        assert_eq!(child.reldepth, 0);
        assert_eq!(child.monodepth, 1);
    }

    #[test]
    fn same_path_different_query_increments_dupdepth() {
        let parent = Nurl::new("https://a.edu/x".to_string());
        let child = child_of(&parent, "https://a.edu/x?page=2");
        assert_eq!(child.dupdepth, 1);
        assert_eq!(child.reldepth, 0);
        assert_eq!(child.monodepth, 0);
    }

    #[test]
    fn different_host_resets_all_relative_depths() {
        let parent = Nurl::new("https://a.edu/x".to_string());
        let child = child_of(&parent, "https://b.edu/x/y");
        assert_eq!(child.absdepth, 1);
        assert_eq!(child.reldepth, 0);
        assert_eq!(child.monodepth, 0);
        assert_eq!(child.dupdepth, 0);
    }

    #[test]
    fn consecutive_dirdepth_chains_accumulate() {
        let lvl1 = Nurl::new("https://a.edu/a".to_string());
        let lvl2 = child_of(&lvl1, "https://a.edu/a/b");
        let lvl3 = child_of(&lvl2, "https://a.edu/a/b/c");
        assert_eq!(lvl3.reldepth, 2);
        assert_eq!(lvl3.monodepth, 2);
        assert_eq!(lvl3.absdepth, 2);
    }
}
