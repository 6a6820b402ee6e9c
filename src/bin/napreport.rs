//! `napreport`: prints a summary of a Nap snapshot without modifying it.

use clap::Parser;
use napcrawl::report;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "napreport", version, about = "Summarize a napcrawl Nap snapshot.")]
struct Args {
    /// Path to the Nap snapshot file.
    nap_file: PathBuf,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let report = match report::generate(&args.nap_file) {
        Ok(report) => report,
        Err(err) => {
            eprintln!("napreport: could not read {}: {err}", args.nap_file.display());
            return ExitCode::FAILURE;
        }
    };

    println!("total urls:      {}", report.total_urls);
    println!("unique domains:  {}", report.unique_domains);
    println!();
    println!("by status:");
    for (status, count) in &report.by_status {
        println!("  {status:<16} {count}");
    }
    println!();
    println!("by finish:");
    for (finish, count) in &report.by_finish {
        println!("  {finish:<16} {count}");
    }
    if let Some((url, words)) = &report.longest_page {
        println!();
        println!("longest page:    {url} ({words} words)");
    }
    println!();
    println!("most common words:");
    for (word, count) in &report.most_common_words {
        println!("  {word:<20} {count}");
    }

    ExitCode::SUCCESS
}
