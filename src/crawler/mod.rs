//! The crawler orchestrator (§4.6): spins up `threads_count` worker tasks
//! that pull from a shared [`Frontier`] until it drains, then closes the
//! [`Nap`] for a clean final save.

use crate::config::Configs;
use crate::fetch;
use crate::frontier::Frontier;
use crate::nap::Nap;
use crate::nurl::Nurl;
use crate::polmut::PoliteMutex;
use crate::robots::RobotsCache;
use crate::worker::{self, WorkerContext};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrawlerError {
    #[error(transparent)]
    Nap(#[from] crate::nap::NapError),
    #[error(transparent)]
    Fetch(#[from] fetch::FetchError),
    #[error(transparent)]
    Url(#[from] crate::weburl::WebUrlError),
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
}

/// Summary returned once every worker has finished.
pub struct CrawlReport {
    pub visited: usize,
}

/// Opens (or resumes) the Nap and frontier described by `configs`, runs the
/// crawl to completion across `configs.crawler.threads_count` tasks, and
/// closes the Nap.
pub async fn run(configs: &Configs, restart: bool, use_cache: bool) -> Result<CrawlReport, CrawlerError> {
    if restart {
        match std::fs::remove_file(&configs.storage.nap_file) {
            Ok(()) => log::info!("crawler: --restart removed existing save file {}", configs.storage.nap_file),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => log::warn!("crawler: could not remove save file {}: {err}", configs.storage.nap_file),
        }
    }

    let nap = Nap::open(
        &configs.storage.nap_file,
        configs.autosave_interval(),
        configs.crawler.autosave_threshold,
    )?;

    let policy = configs.policy.traversal_policy()?;

    let frontier = if restart {
        Arc::new(Frontier::new(nap.clone(), policy))
    } else {
        Arc::new(Frontier::resume(nap.clone(), policy, !use_cache)?)
    };

    if restart || frontier.is_empty() {
        for seed in &configs.seeds.urls {
            if let Ok(nurl) = Nurl::from_raw(seed) {
                frontier.add_nurl(nurl)?;
            } else {
                log::warn!("crawler: could not parse seed url {seed}");
            }
        }
    }

    let client = fetch::build_client(
        &configs.identification.user_agent,
        Duration::from_secs(30),
        configs.identification.cache_server.as_deref(),
    )?;
    let global_polmut = Arc::new(PoliteMutex::new(configs.policy.politeness_delay()));
    let robots = Arc::new(RobotsCache::new(
        client.clone(),
        configs.identification.user_agent.clone(),
        configs.policy.politeness_delay(),
        global_polmut.clone(),
    ));

    let ctx = Arc::new(WorkerContext {
        client,
        robots,
        global_polmut,
        limits: configs.limits.clone(),
        user_agent: configs.identification.user_agent.clone(),
        strict_domains: configs.policy.strict_domains,
        allowed_suffixes: configs.policy.allowed_suffixes.clone(),
        use_cache,
    });

    let visited = Arc::new(AtomicUsize::new(0));
    let mut handles = Vec::new();
    for worker_id in 0..configs.crawler.threads_count {
        let ctx = ctx.clone();
        let nap = nap.clone();
        let frontier = frontier.clone();
        let visited = visited.clone();
        handles.push(tokio::spawn(async move {
            run_worker_loop(worker_id, ctx, nap, frontier, visited).await
        }));
    }

    for handle in handles {
        if let Err(err) = handle.await {
            log::error!("crawler: worker task panicked: {err}");
        }
    }

    nap.close(3).await;

    Ok(CrawlReport { visited: visited.load(Ordering::SeqCst) })
}

async fn run_worker_loop(
    worker_id: usize,
    ctx: Arc<WorkerContext>,
    nap: Nap,
    frontier: Arc<Frontier>,
    visited: Arc<AtomicUsize>,
) {
    loop {
        let nurl = match frontier.get_tbd_nurl() {
            Ok(Some(nurl)) => nurl,
            Ok(None) => {
                log::debug!("worker[{worker_id}]: frontier drained");
                break;
            }
            Err(err) => {
                log::error!("worker[{worker_id}]: frontier error: {err}");
                break;
            }
        };

        let url = nurl.url.clone();
        match worker::process(&ctx, &nap, nurl).await {
            Ok(outcome) => {
                for child in outcome.discovered {
                    if let Err(err) = frontier.add_nurl(child) {
                        log::warn!("worker[{worker_id}]: could not enqueue discovered url: {err}");
                    }
                }
                if let Err(err) = frontier.mark_nurl_complete(&outcome.nurl) {
                    log::error!("worker[{worker_id}]: could not commit {url}: {err}");
                }
                visited.fetch_add(1, Ordering::SeqCst);
                log::info!("worker[{worker_id}]: {url} -> {:?}", outcome.nurl.finish);
            }
            Err(err) => {
                log::error!("worker[{worker_id}]: pipeline error on {url}: {err}");
            }
        }
    }
}
