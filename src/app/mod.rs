//! The `napcrawl` binary's entry point: parse args, load config, run the
//! crawl to completion on a multi-threaded Tokio runtime.

mod args;
mod logging;

pub use args::NapcrawlArgs;

use crate::config::Configs;
use crate::crawler::CrawlReport;
use anyhow::Context;
use log::LevelFilter;
use std::process::ExitCode;

/// Runs the crawler for `args`, returning the process exit code. Errors are
/// collected with `anyhow` at this boundary only -- every component below
/// this point returns its own typed error.
pub fn exec_args(args: NapcrawlArgs) -> ExitCode {
    logging::init(Some("napcrawl.log"), LevelFilter::Info);

    match run(args) {
        Ok(report) => {
            log::info!("napcrawl: crawl finished, visited {} url(s)", report.visited);
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("napcrawl: crawl failed: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: NapcrawlArgs) -> anyhow::Result<CrawlReport> {
    let config_path = args.config_file.to_string_lossy().into_owned();
    let configs = Configs::load(&config_path)
        .with_context(|| format!("loading config file {config_path}"))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(configs.crawler.threads_count)
        .enable_all()
        .build()
        .context("starting the async runtime")?;

    runtime
        .block_on(crate::crawler::run(&configs, args.restart, args.use_cache))
        .context("running the crawl")
}
