//! robots.txt cache and the per-domain politeness gate that sits alongside it
//! (§4.3). One [`DomainInfo`] is created per host on first visit: it holds
//! the parsed robots rules (if any), any sitemap URLs robots.txt announced,
//! and the [`PoliteMutex`] that serializes fetches to that host. The
//! robots.txt request itself is also gated by the process-wide global
//! politeness mutex shared with every page fetch (see `RobotsCache::new`).

use crate::polmut::PoliteMutex;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use texting_robots::Robot;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum RobotsError {
    #[error("fetching robots.txt: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("parsing robots.txt: {0}")]
    Parse(#[from] texting_robots::Error),
    #[error("url {0} has no host")]
    NoHost(String),
}

/// Cached robots.txt state plus the politeness gate for one domain.
pub struct DomainInfo {
    pub robot: Option<Robot>,
    /// Set when robots.txt answered 401/403: the domain must be treated as
    /// fully disallowed rather than the "no robots.txt" allow-all default.
    pub disallowed: bool,
    pub sitemaps: Vec<String>,
    pub polmut: PoliteMutex,
}

impl DomainInfo {
    fn allow_all(delay: Duration) -> Self {
        Self { robot: None, disallowed: false, sitemaps: Vec::new(), polmut: PoliteMutex::new(delay) }
    }

    fn disallowed(delay: Duration) -> Self {
        Self { robot: None, disallowed: true, sitemaps: Vec::new(), polmut: PoliteMutex::new(delay) }
    }

    /// Returns whether `url` may be fetched under this domain's rules. A
    /// domain with no reachable or parseable robots.txt allows everything;
    /// one that answered 401/403 disallows everything.
    pub fn is_allowed(&self, url: &Url, user_agent: &str) -> bool {
        if self.disallowed {
            return false;
        }
        match &self.robot {
            Some(robot) => robot.allowed(url.as_str()),
            None => {
                let _ = user_agent;
                true
            }
        }
    }
}

/// Shared cache of [`DomainInfo`] keyed by host, populated lazily on first
/// visit to each domain.
pub struct RobotsCache {
    client: reqwest::Client,
    user_agent: String,
    default_delay: Duration,
    /// Process-wide politeness floor: acquired before the robots.txt
    /// request here and before every page fetch in `worker`, so any two
    /// network calls anywhere are spaced at least this mutex's delay apart,
    /// regardless of domain.
    global_polmut: Arc<PoliteMutex>,
    domains: Mutex<HashMap<String, Arc<DomainInfo>>>,
}

impl RobotsCache {
    pub fn new(
        client: reqwest::Client,
        user_agent: String,
        default_delay: Duration,
        global_polmut: Arc<PoliteMutex>,
    ) -> Self {
        Self { client, user_agent, default_delay, global_polmut, domains: Mutex::new(HashMap::new()) }
    }

    /// Returns the cached (or freshly fetched) [`DomainInfo`] for `url`'s
    /// host. Sharing the `Arc` is what lets two workers serialize through
    /// the same [`PoliteMutex`].
    pub async fn domain_info(&self, url: &Url) -> Result<Arc<DomainInfo>, RobotsError> {
        let host = url.host_str().ok_or_else(|| RobotsError::NoHost(url.to_string()))?.to_string();

        if let Some(existing) = self.domains.lock().expect("robots cache mutex poisoned").get(&host) {
            return Ok(existing.clone());
        }

        let info = Arc::new(self.fetch_domain_info(url, &host).await?);

        let mut guard = self.domains.lock().expect("robots cache mutex poisoned");
        let entry = guard.entry(host).or_insert_with(|| info.clone());
        Ok(entry.clone())
    }

    async fn fetch_domain_info(&self, url: &Url, host: &str) -> Result<DomainInfo, RobotsError> {
        let robots_url = format!("{}://{}/robots.txt", url.scheme(), host);

        let response = {
            let _guard = self.global_polmut.acquire().await;
            self.client.get(&robots_url).send().await
        };

        match response {
            Ok(resp) if resp.status().as_u16() == 401 || resp.status().as_u16() == 403 => {
                log::debug!("robots: {host} returned {} for robots.txt, disallowing all", resp.status());
                Ok(DomainInfo::disallowed(self.default_delay))
            }
            Ok(resp) if resp.status().is_success() => {
                let Ok(body) = resp.bytes().await else {
                    log::debug!("robots: could not read robots.txt body for {host}, allowing all");
                    return Ok(DomainInfo::allow_all(self.default_delay));
                };

                let robot = Robot::new(&self.user_agent, &body)?;
                let delay = robot
                    .delay
                    .map(|secs| Duration::from_secs_f32(secs))
                    .unwrap_or(self.default_delay);
                let sitemaps = robot.sitemaps.clone();

                log::info!("robots: loaded {host} ({} sitemap(s), delay={:?})", sitemaps.len(), delay);

                Ok(DomainInfo { robot: Some(robot), disallowed: false, sitemaps, polmut: PoliteMutex::new(delay) })
            }
            Ok(resp) => {
                log::debug!("robots: {host} returned {} for robots.txt, allowing all", resp.status());
                Ok(DomainInfo::allow_all(self.default_delay))
            }
            Err(err) => {
                log::debug!("robots: fetching robots.txt for {host} failed: {err}, allowing all");
                Ok(DomainInfo::allow_all(self.default_delay))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn no_robots_allows_everything() {
        let info = DomainInfo::allow_all(Duration::from_secs(1));
        let url = Url::parse("https://a.edu/anything").unwrap();
        assert!(info.is_allowed(&url, "napcrawl"));
    }

    #[test]
    fn disallowed_domain_blocks_everything() {
        let info = DomainInfo::disallowed(Duration::from_secs(1));
        let url = Url::parse("https://a.edu/anything").unwrap();
        assert!(!info.is_allowed(&url, "napcrawl"));
    }
}
