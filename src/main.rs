use clap::Parser;
use napcrawl::app::{exec_args, NapcrawlArgs};
use std::process::ExitCode;

fn main() -> ExitCode {
    exec_args(NapcrawlArgs::parse())
}
