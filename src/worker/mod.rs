//! The fixed-stage worker pipeline (§4.5): every fetched URL passes through
//! SIFT, DOMAIN, FETCH, PRE-FILTER, TEXT, EXTRACT, TRANSFORM & ENQUEUE and
//! COMMIT in order. No stage panics; each either advances the `Nurl` to the
//! next stage, short-circuits it with a terminal [`Finish`], or (FETCH only)
//! retries on transient failure.

use crate::config::LimitsSection;
use crate::fetch::{self, FetchError};
use crate::hashing;
use crate::nap::{BucketClaim, Nap, NapError};
use crate::nurl::{Finish, Nurl, Status};
use crate::parse;
use crate::polmut::PoliteMutex;
use crate::robots::RobotsCache;
use crate::text;
use crate::weburl;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Nap(#[from] NapError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// The shared, read-only state every worker task needs to run the pipeline.
pub struct WorkerContext {
    pub client: reqwest::Client,
    pub robots: Arc<RobotsCache>,
    /// Process-wide politeness floor, shared with `robots::RobotsCache`'s
    /// robots.txt fetches; acquired before every page fetch too (lock order
    /// `global_polmut -> domain_polmut`).
    pub global_polmut: Arc<PoliteMutex>,
    pub limits: LimitsSection,
    pub user_agent: String,
    pub strict_domains: bool,
    pub allowed_suffixes: Vec<String>,
    /// Mirrors `--use_cache`: when `false`, a fetch failure or retryable
    /// status is not retried at all.
    pub use_cache: bool,
}

/// The result of running one `Nurl` through the pipeline: the `Nurl` itself
/// (now carrying its terminal `finish` and, if downloaded, its word/hash
/// data) plus any newly discovered children to feed back into the frontier.
pub struct Outcome {
    pub nurl: Nurl,
    pub discovered: Vec<Nurl>,
}

fn finished(nurl: Nurl, finish: Finish) -> Outcome {
    let mut nurl = nurl;
    nurl.status = Status::Downloaded;
    nurl.finish = finish;
    Outcome { nurl, discovered: Vec::new() }
}

/// Runs the full pipeline for one popped `Nurl`. Mutations to `nap`'s dedup
/// buckets happen as a side effect of PRE-FILTER/TEXT; the caller is
/// responsible for writing the returned `nurl` and enqueuing `discovered`
/// via [`crate::frontier::Frontier`].
pub async fn process(ctx: &WorkerContext, nap: &Nap, nurl: Nurl) -> Result<Outcome, WorkerError> {
    // SIFT
    let url = match Url::parse(&nurl.url) {
        Ok(url) => url,
        Err(_) => return Ok(finished(nurl, Finish::Bad)),
    };
    if !weburl::is_valid(&url, ctx.strict_domains, &ctx.allowed_suffixes) {
        return Ok(finished(nurl, Finish::Sifted));
    }

    // DOMAIN
    let domain_info = match ctx.robots.domain_info(&url).await {
        Ok(info) => info,
        Err(err) => {
            log::warn!("worker: domain lookup failed for {}: {err}", nurl.url);
            return Ok(finished(nurl, Finish::CacheError));
        }
    };
    if !domain_info.is_allowed(&url, &ctx.user_agent) {
        return Ok(finished(nurl, Finish::NotAllowed));
    }

    let mut discovered = sitemap_children(&domain_info.sitemaps, &url);

    // FETCH, politely (global floor, then per-domain floor), with the
    // configured retry schedule.
    let response = {
        let _global_guard = ctx.global_polmut.acquire().await;
        let _guard = domain_info.polmut.acquire().await;
        fetch_with_retries(ctx, &url).await
    };
    let Some(response) = response else {
        return Ok(finished(nurl, Finish::Bad));
    };

    if response.is_redirect() {
        if let Some(target) = &response.redirect_target {
            if let Ok(resolved) = url.join(target) {
                if let Ok(normalized) = weburl::normalize(resolved.as_str()) {
                    let mut child = Nurl::new(normalized.to_string());
                    child.set_parent(&nurl);
                    discovered.push(child);
                }
            }
        }
        return Ok(Outcome { nurl: finished(nurl, Finish::Redirect).nurl, discovered });
    }
    if !response.is_success() {
        return Ok(finished(nurl, Finish::Bad));
    }

    // PRE-FILTER: content length bounds, then exact-content dedup.
    let body_len = response.body.len();
    if body_len < ctx.limits.min_content_len || body_len > ctx.limits.max_content_len {
        return Ok(finished(nurl, Finish::LowInfoPre));
    }

    let exhash = hashing::exhash(&response.body);
    let exact_claim = nap.claim_exact_bucket(&exhash, &nurl.hash)?;

    // TEXT + EXTRACT
    let parsed = parse::parse(response.content_type.as_deref(), &url, &response.body);

    for discovered_link in extract_children(&parsed.links, &nurl, ctx) {
        discovered.push(discovered_link);
    }

    if parsed.is_sitemap {
        let mut nurl = nurl;
        nurl.exhash = Some(exhash);
        return Ok(Outcome { nurl: finished(nurl, Finish::Ok).nurl, discovered });
    }

    let words = text::content_words(&parsed.text_content);
    let total_words = words.len();
    let counts = text::word_count(&words);
    let unique_words = counts.len();
    let max_word_count = counts.values().copied().max().unwrap_or(0);

    let low_info_post = unique_words < ctx.limits.min_unique_words
        || max_word_count < ctx.limits.min_max_word_count
        || total_words < ctx.limits.min_words;
    if low_info_post {
        let mut nurl = nurl;
        nurl.exhash = Some(exhash);
        return Ok(finished(nurl, Finish::LowInfoPost));
    }

    let smhash = hashing::smhash(&counts);
    let similar_claim = nap.claim_similar_bucket(smhash, &nurl.hash, ctx.limits.similarity_threshold)?;

    // COMMIT
    let mut nurl = nurl;
    nurl.words = counts;
    nurl.links = discovered.iter().map(|d| d.url.clone()).collect();
    nurl.exhash = Some(exhash);
    nurl.smhash = Some(smhash);

    let finish = match (exact_claim, similar_claim) {
        (BucketClaim::Follower { .. }, _) => Finish::TooExact,
        (_, BucketClaim::Follower { .. }) => Finish::TooSimilar,
        _ => Finish::Ok,
    };

    nurl.status = Status::Downloaded;
    nurl.finish = finish;
    Ok(Outcome { nurl, discovered })
}

/// Retries on a transport error or an HTTP 500-511 response, using the
/// configured delay schedule. If `use_cache` is off, a single attempt is
/// made and whatever it returns (success, error response, or nothing on a
/// transport failure) is final.
async fn fetch_with_retries(ctx: &WorkerContext, url: &Url) -> Option<fetch::Response> {
    let schedule: Vec<u64> = if ctx.use_cache {
        std::iter::once(0u64).chain(ctx.limits.retry_delay_secs.iter().copied()).collect()
    } else {
        vec![0]
    };

    let mut last_response = None;
    for delay_secs in schedule {
        if delay_secs > 0 {
            tokio::time::sleep(Duration::from_secs(delay_secs)).await;
        }
        match fetch::fetch(&ctx.client, url).await {
            Ok(response) if (500..=511).contains(&response.status) => {
                log::debug!("worker: fetch attempt for {url} got retryable status {}", response.status);
                last_response = Some(response);
            }
            Ok(response) => return Some(response),
            Err(err) => log::debug!("worker: fetch attempt for {url} failed: {err}"),
        }
    }
    last_response
}

fn sitemap_children(sitemaps: &[String], domain_url: &Url) -> Vec<Nurl> {
    let robots_url = format!("{}://{}/robots.txt", domain_url.scheme(), domain_url.host_str().unwrap_or_default());
    sitemaps
        .iter()
        .filter_map(|sitemap_url| weburl::normalize(sitemap_url).ok())
        .map(|normalized| {
            let mut child = Nurl::new(normalized.to_string());
            child.set_robots_parent(robots_url.clone());
            child
        })
        .collect()
}

fn extract_children(links: &[String], parent: &Nurl, ctx: &WorkerContext) -> Vec<Nurl> {
    let mut out = Vec::new();
    for link in links {
        let Ok(normalized) = weburl::normalize(link) else { continue };
        if !weburl::is_valid(&normalized, ctx.strict_domains, &ctx.allowed_suffixes) {
            continue;
        }
        let mut child = Nurl::new(normalized.to_string());
        child.set_parent(parent);

        if child.absdepth > ctx.limits.max_absdepth
            || child.reldepth > ctx.limits.max_reldepth
            || child.monodepth > ctx.limits.max_monodepth
            || child.dupdepth > ctx.limits.max_dupdepth
        {
            continue;
        }
        out.push(child);
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn low_info_post_fires_if_any_one_condition_fails() {
        let limits = LimitsSection {
            retry_delay_secs: vec![],
            min_content_len: 0,
            max_content_len: 1_000_000,
            max_absdepth: 8,
            max_reldepth: 2,
            max_monodepth: 3,
            max_dupdepth: 1,
            min_words: 20,
            min_max_word_count: 2,
            min_unique_words: 5,
            similarity_threshold: 5,
        };

        // None of the three conditions fail -> not low-info.
        let total_words = 30;
        let unique_words = 8;
        let max_word_count = 10;
        let low_info = unique_words < limits.min_unique_words
            || max_word_count < limits.min_max_word_count
            || total_words < limits.min_words;
        assert!(!low_info);

        // Only unique_words fails -> still low-info.
        let total_words = 30;
        let unique_words = 3;
        let max_word_count = 10;
        let low_info = unique_words < limits.min_unique_words
            || max_word_count < limits.min_max_word_count
            || total_words < limits.min_words;
        assert!(low_info);

        // All three fail -> low-info.
        let total_words = 2;
        let unique_words = 2;
        let max_word_count = 1;
        let low_info = unique_words < limits.min_unique_words
            || max_word_count < limits.min_max_word_count
            || total_words < limits.min_words;
        assert!(low_info);
    }
}
