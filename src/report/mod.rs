//! Read-only crawl summary (§6), built by scanning a Nap snapshot without
//! opening it for writing.

use crate::nap::{self, NapError};
use crate::nurl::{Finish, Status};
use crate::text;
use std::collections::HashMap;
use std::path::Path;

/// A summary of one Nap's contents.
#[derive(Debug)]
pub struct Report {
    pub total_urls: usize,
    pub by_status: HashMap<String, usize>,
    pub by_finish: HashMap<String, usize>,
    pub unique_domains: usize,
    pub longest_page: Option<(String, usize)>,
    pub most_common_words: Vec<(String, u32)>,
}

/// Builds a [`Report`] from the Nap snapshot at `path`.
pub fn generate(path: impl AsRef<Path>) -> Result<Report, NapError> {
    let nurls = nap::read_only_snapshot(path)?;

    let mut by_status: HashMap<String, usize> = HashMap::new();
    let mut by_finish: HashMap<String, usize> = HashMap::new();
    let mut domains = std::collections::HashSet::new();
    let mut longest_page: Option<(String, usize)> = None;
    let mut total_words: HashMap<String, u32> = HashMap::new();

    for nurl in &nurls {
        *by_status.entry(status_label(&nurl.status)).or_insert(0) += 1;
        *by_finish.entry(finish_label(&nurl.finish)).or_insert(0) += 1;

        if let Ok(url) = url::Url::parse(&nurl.url) {
            if let Some(host) = url.host_str() {
                domains.insert(host.to_string());
            }
        }

        let word_count: usize = nurl.words.values().map(|&c| c as usize).sum();
        if longest_page.as_ref().map(|(_, best)| word_count > *best).unwrap_or(word_count > 0) {
            longest_page = Some((nurl.url.clone(), word_count));
        }

        for (word, count) in &nurl.words {
            *total_words.entry(word.clone()).or_insert(0) += count;
        }
    }

    Ok(Report {
        total_urls: nurls.len(),
        by_status,
        by_finish,
        unique_domains: domains.len(),
        longest_page,
        most_common_words: text::common_words(&total_words, 20),
    })
}

fn status_label(status: &Status) -> String {
    status.to_string()
}

fn finish_label(finish: &Finish) -> String {
    finish.to_string()
}
