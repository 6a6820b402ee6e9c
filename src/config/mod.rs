//! Runtime configuration (§6): an INI file loaded through the `config`
//! crate, mirroring the section layout `[CRAWLER]`, `[IDENTIFICATION]`,
//! `[SEEDS]`, `[STORAGE]`, `[POLICY]`, `[LIMITS]`.

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),
    #[error("unknown traversal policy {0:?}, expected dfs, bfs, or hybrid")]
    UnknownTraversal(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerSection {
    #[serde(default = "default_threads_count")]
    pub threads_count: usize,
    #[serde(default = "default_autosave_interval_secs")]
    pub autosave_interval_secs: u64,
    #[serde(default = "default_autosave_threshold")]
    pub autosave_threshold: u64,
}

fn default_threads_count() -> usize {
    num_cpus::get()
}
fn default_autosave_interval_secs() -> u64 {
    60
}
fn default_autosave_threshold() -> u64 {
    50
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentificationSection {
    pub user_agent: String,
    /// Optional caching proxy every request is routed through instead of
    /// hitting origins directly (`fetch::build_client`'s `reqwest::Proxy`).
    #[serde(default)]
    pub cache_server: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedsSection {
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSection {
    #[serde(default = "default_nap_file")]
    pub nap_file: String,
}

fn default_nap_file() -> String {
    "napcrawl.nap".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct PolicySection {
    #[serde(default = "default_traversal")]
    pub traversal: String,
    #[serde(default = "default_hybrid_depth")]
    pub hybrid_depth: u64,
    #[serde(default)]
    pub strict_domains: bool,
    #[serde(default)]
    pub allowed_suffixes: Vec<String>,
    #[serde(default = "default_politeness_delay_secs")]
    pub politeness_delay_secs: f32,
}

fn default_traversal() -> String {
    "bfs".to_string()
}
fn default_hybrid_depth() -> u64 {
    3
}
fn default_politeness_delay_secs() -> f32 {
    0.5
}

/// DFS/BFS/Hybrid(h) traversal policy, parsed from [`PolicySection::traversal`].
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TraversalPolicy {
    Dfs,
    Bfs,
    Hybrid(u64),
}

impl PolicySection {
    pub fn traversal_policy(&self) -> Result<TraversalPolicy, ConfigError> {
        match self.traversal.to_ascii_lowercase().as_str() {
            "dfs" => Ok(TraversalPolicy::Dfs),
            "bfs" => Ok(TraversalPolicy::Bfs),
            "hybrid" => Ok(TraversalPolicy::Hybrid(self.hybrid_depth)),
            other => Err(ConfigError::UnknownTraversal(other.to_string())),
        }
    }

    pub fn politeness_delay(&self) -> Duration {
        Duration::from_secs_f32(self.politeness_delay_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitsSection {
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: Vec<u64>,
    #[serde(default = "default_min_content_len")]
    pub min_content_len: usize,
    #[serde(default = "default_max_content_len")]
    pub max_content_len: usize,
    #[serde(default = "default_max_absdepth")]
    pub max_absdepth: u64,
    #[serde(default = "default_max_reldepth")]
    pub max_reldepth: u64,
    #[serde(default = "default_max_monodepth")]
    pub max_monodepth: u64,
    #[serde(default = "default_max_dupdepth")]
    pub max_dupdepth: u64,
    #[serde(default = "default_min_words")]
    pub min_words: usize,
    #[serde(default = "default_min_max_word_count")]
    pub min_max_word_count: u32,
    #[serde(default = "default_min_unique_words")]
    pub min_unique_words: usize,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: u32,
}

fn default_retry_delay_secs() -> Vec<u64> {
    vec![1, 2, 4, 8, 16]
}
fn default_min_content_len() -> usize {
    200
}
fn default_max_content_len() -> usize {
    1_000_000
}
fn default_max_absdepth() -> u64 {
    8
}
fn default_max_reldepth() -> u64 {
    2
}
fn default_max_monodepth() -> u64 {
    3
}
fn default_max_dupdepth() -> u64 {
    1
}
fn default_min_words() -> usize {
    20
}
fn default_min_max_word_count() -> u32 {
    2
}
fn default_min_unique_words() -> usize {
    5
}
fn default_similarity_threshold() -> u32 {
    5
}

/// The full configuration loaded from an INI file.
#[derive(Debug, Clone, Deserialize)]
pub struct Configs {
    #[serde(rename = "CRAWLER")]
    pub crawler: CrawlerSection,
    #[serde(rename = "IDENTIFICATION")]
    pub identification: IdentificationSection,
    #[serde(rename = "SEEDS")]
    pub seeds: SeedsSection,
    #[serde(rename = "STORAGE")]
    pub storage: StorageSection,
    #[serde(rename = "POLICY")]
    pub policy: PolicySection,
    #[serde(rename = "LIMITS")]
    pub limits: LimitsSection,
}

impl Configs {
    /// Loads configuration from an INI file at `path`.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let built = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;
        Ok(built.try_deserialize()?)
    }

    pub fn autosave_interval(&self) -> Duration {
        Duration::from_secs(self.crawler.autosave_interval_secs)
    }
}
