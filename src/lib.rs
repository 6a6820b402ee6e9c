//! napcrawl: a polite, resumable, multi-threaded web crawler.
//!
//! The crawl coordination engine (`nurl`, `nap`, `frontier`, `polmut`, `worker`,
//! `crawler`) is the core of this crate. `fetch`, `parse`, `text`, `robots`,
//! `hashing`, `app` and `report` are the concrete collaborators it is wired to.

pub mod app;
pub mod config;
pub mod crawler;
pub mod error;
pub mod fetch;
pub mod frontier;
pub mod hashing;
pub mod nap;
pub mod nurl;
pub mod parse;
pub mod polmut;
pub mod report;
pub mod robots;
pub mod text;
pub mod weburl;
pub mod worker;

pub use error::NapcrawlError;
