//! Command-line surface for the `napcrawl` binary.

use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "napcrawl", version, about = "A polite, resumable, multi-threaded web crawler.")]
pub struct NapcrawlArgs {
    /// Path to the INI configuration file.
    #[arg(long, default_value = "config.ini")]
    pub config_file: PathBuf,

    /// Discard any existing Nap at the configured storage path and start a
    /// fresh crawl from the configured seeds, instead of resuming.
    #[arg(long, default_value_t = false)]
    pub restart: bool,

    /// Skip re-downloading URLs already marked `Downloaded` in the Nap
    /// (on by default; pass `--use_cache=false` to force a refetch of
    /// everything the frontier still enqueues).
    #[arg(long, default_value_t = true)]
    pub use_cache: bool,
}
