//! Top-level error type gluing every component's typed error into one enum
//! for the parts of the crate (the `app` entry points, the crawler
//! orchestrator) that need to report a single failure, while every
//! individual component still returns its own `thiserror` type internally.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NapcrawlError {
    #[error(transparent)]
    Nap(#[from] crate::nap::NapError),

    #[error(transparent)]
    Url(#[from] crate::weburl::WebUrlError),

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error(transparent)]
    Robots(#[from] crate::robots::RobotsError),

    #[error(transparent)]
    Fetch(#[from] crate::fetch::FetchError),

    #[error(transparent)]
    Crawler(#[from] crate::crawler::CrawlerError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
