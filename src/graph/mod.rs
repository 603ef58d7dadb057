//! Graph expansion: modes, link records, prioritization, and domain scope.

pub mod manager;
pub mod prioritizer;

pub use manager::{GraphManager, GraphStats};
pub use prioritizer::LinkPrioritizer;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::utils::constants::{
    DEFAULT_GRAPH_MAX_DEPTH, DEFAULT_MAX_DOMAINS, DEFAULT_MIN_DOMAIN_SCORE,
};

/// How link following treats hosts outside the seed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlMode {
    /// Only crawl within the seed hosts
    SingleDomain,
    /// Follow links across hosts, bounded by domain count and score
    CrossDomain,
    /// Only crawl hosts in the configured allowed set
    Whitelist,
    /// Full graph expansion with score-gated host discovery
    Graph,
    /// Graph expansion with keyword-priority bias
    Focused,
}

impl CrawlMode {
    /// Parse a mode name, defaulting to `SingleDomain` for unknown input.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "cross_domain" => Self::CrossDomain,
            "whitelist" => Self::Whitelist,
            "graph" => Self::Graph,
            "focused" => Self::Focused,
            _ => Self::SingleDomain,
        }
    }
}

/// Configuration for graph-based crawling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphConfig {
    pub mode: CrawlMode,
    pub max_depth: usize,
    pub max_domains: usize,
    pub allowed_domains: HashSet<String>,
    pub blocked_domains: HashSet<String>,
    pub priority_domains: HashSet<String>,
    pub keyword_filters: Vec<String>,
    pub min_domain_score: f64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            mode: CrawlMode::SingleDomain,
            max_depth: DEFAULT_GRAPH_MAX_DEPTH,
            max_domains: DEFAULT_MAX_DOMAINS,
            allowed_domains: HashSet::new(),
            blocked_domains: HashSet::new(),
            priority_domains: HashSet::new(),
            keyword_filters: Vec::new(),
            min_domain_score: DEFAULT_MIN_DOMAIN_SCORE,
        }
    }
}

/// A discovered link with its computed crawl priority.
#[derive(Debug, Clone, Serialize)]
pub struct LinkInfo {
    pub url: String,
    pub source_url: String,
    pub host: String,
    pub depth: usize,
    pub priority: i32,
    pub link_text: String,
}
