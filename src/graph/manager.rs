//! Graph crawl management
//!
//! Tracks discovered hosts, per-URL depth, and per-host reputation scores,
//! applies the configured mode's scope rules, and turns a page's raw link
//! inventory into a priority-sorted list of crawlable links.

use std::collections::{HashMap, HashSet};

use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::Serialize;
use url::Url;

use super::prioritizer::LinkPrioritizer;
use super::{CrawlMode, GraphConfig, LinkInfo};
use crate::dedup::canonicalize;
use crate::utils::extract_host;

/// Snapshot of graph state for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct GraphStats {
    pub discovered_domains: usize,
    pub domains: Vec<String>,
    pub seed_domains: Vec<String>,
    pub domain_link_counts: HashMap<String, u64>,
    pub domain_scores: HashMap<String, f64>,
    pub max_depth_reached: usize,
}

#[derive(Default)]
struct GraphState {
    discovered_hosts: HashSet<String>,
    seed_hosts: HashSet<String>,
    host_link_counts: HashMap<String, u64>,
    host_scores: HashMap<String, f64>,
    depths: HashMap<String, usize>,
}

/// Mode-aware link discovery over the growing host graph.
pub struct GraphManager {
    config: GraphConfig,
    prioritizer: LinkPrioritizer,
    state: Mutex<GraphState>,
}

impl GraphManager {
    #[must_use]
    pub fn new(config: GraphConfig) -> Self {
        Self {
            prioritizer: LinkPrioritizer::new(config.clone()),
            config,
            state: Mutex::new(GraphState::default()),
        }
    }

    /// Record the seed URLs: their hosts anchor the graph at depth 0.
    ///
    /// Depths are keyed by canonical URL, matching what the frontier hands
    /// back to the loop.
    pub fn initialize_seeds(&self, seed_urls: &[String]) {
        let mut state = self.state.lock();
        for url in seed_urls {
            let host = extract_host(url);
            state.seed_hosts.insert(host.clone());
            state.discovered_hosts.insert(host);
            state.depths.insert(canonicalize(url), 0);
        }
    }

    /// Apply the mode's scope rules to a host.
    #[must_use]
    pub fn should_crawl_domain(&self, host: &str) -> (bool, String) {
        let host = host.to_lowercase();
        let state = self.state.lock();

        if self.config.blocked_domains.contains(&host) {
            return (false, format!("host {host} is blocked"));
        }

        match self.config.mode {
            CrawlMode::SingleDomain => {
                if !state.seed_hosts.contains(&host) {
                    return (false, "cross-domain crawling disabled".to_string());
                }
            }
            CrawlMode::Whitelist => {
                if !self.config.allowed_domains.contains(&host) {
                    return (false, format!("host {host} not in whitelist"));
                }
            }
            CrawlMode::CrossDomain | CrawlMode::Graph | CrawlMode::Focused => {
                if state.discovered_hosts.len() >= self.config.max_domains
                    && !state.discovered_hosts.contains(&host)
                {
                    return (
                        false,
                        format!("maximum domains ({}) reached", self.config.max_domains),
                    );
                }

                if !state.seed_hosts.contains(&host) {
                    let score = state.host_scores.get(&host).copied().unwrap_or(0.0);
                    if score < self.config.min_domain_score {
                        return (
                            false,
                            format!(
                                "host score {score:.2} below threshold {}",
                                self.config.min_domain_score
                            ),
                        );
                    }
                }
            }
        }

        (true, "OK".to_string())
    }

    /// Resolve, scope-check, and prioritize a page's outgoing links.
    ///
    /// Returns an empty list when the source page is already at the depth
    /// limit. The result is sorted by priority, highest first.
    #[must_use]
    pub fn extract_links(
        &self,
        source_url: &str,
        links: &[String],
        page_body: &str,
    ) -> Vec<LinkInfo> {
        let source_key = canonicalize(source_url);
        let current_depth = {
            let state = self.state.lock();
            state.depths.get(&source_key).copied().unwrap_or(0)
        };

        if current_depth >= self.config.max_depth {
            info!("Maximum depth {} reached for {source_url}", self.config.max_depth);
            return Vec::new();
        }

        let source_host = extract_host(source_url);
        let base = Url::parse(source_url).ok();
        let mut discovered = Vec::new();

        for raw_link in links {
            let Some(absolute) = resolve_link(base.as_ref(), raw_link) else {
                continue;
            };
            let target_host = extract_host(absolute.as_str());
            if target_host.is_empty() {
                continue;
            }

            let (allow, reason) = self.should_crawl_domain(&target_host);
            if !allow {
                debug!("Skipping link {absolute}: {reason}");
                continue;
            }

            let mut link = LinkInfo {
                url: absolute.to_string(),
                source_url: source_url.to_string(),
                host: target_host.clone(),
                depth: current_depth + 1,
                priority: 0,
                link_text: String::new(),
            };

            let priority = self.prioritizer.calculate_priority(&link, page_body);
            if priority <= 0 {
                continue;
            }
            link.priority = priority;

            let mut state = self.state.lock();
            if state.discovered_hosts.insert(target_host.clone()) {
                info!("Discovered new host: {target_host}");
            }
            *state.host_link_counts.entry(target_host.clone()).or_default() += 1;
            Self::update_host_score(&self.config, &mut state, &target_host, &source_host, priority);
            state.depths.insert(canonicalize(&link.url), current_depth + 1);
            drop(state);

            discovered.push(link);
        }

        discovered.sort_by(|a, b| b.priority.cmp(&a.priority));
        info!("Discovered {} prioritized links from {source_url}", discovered.len());
        discovered
    }

    /// Reputation update: decayed EMA fed by incoming link priority, with a
    /// multiplier for links from seed or priority hosts.
    fn update_host_score(
        config: &GraphConfig,
        state: &mut GraphState,
        target_host: &str,
        source_host: &str,
        priority: i32,
    ) {
        let mut increment = f64::from(priority) / 1000.0;
        if state.seed_hosts.contains(source_host) {
            increment *= 2.0;
        } else if config.priority_domains.contains(source_host) {
            increment *= 1.5;
        }

        let current = state.host_scores.get(target_host).copied().unwrap_or(0.0);
        state
            .host_scores
            .insert(target_host.to_string(), current * 0.9 + increment);
    }

    /// Depth recorded for a URL, if it has been seen.
    #[must_use]
    pub fn depth_of(&self, url: &str) -> Option<usize> {
        self.state.lock().depths.get(&canonicalize(url)).copied()
    }

    /// Current reputation score for a host.
    #[must_use]
    pub fn host_score(&self, host: &str) -> f64 {
        self.state.lock().host_scores.get(host).copied().unwrap_or(0.0)
    }

    #[must_use]
    pub fn stats(&self) -> GraphStats {
        let state = self.state.lock();
        GraphStats {
            discovered_domains: state.discovered_hosts.len(),
            domains: state.discovered_hosts.iter().cloned().collect(),
            seed_domains: state.seed_hosts.iter().cloned().collect(),
            domain_link_counts: state.host_link_counts.clone(),
            domain_scores: state
                .host_scores
                .iter()
                .map(|(k, v)| (k.clone(), (v * 1000.0).round() / 1000.0))
                .collect(),
            max_depth_reached: state.depths.values().copied().max().unwrap_or(0),
        }
    }
}

fn resolve_link(base: Option<&Url>, raw: &str) -> Option<Url> {
    let resolved = match base {
        Some(base) => base.join(raw),
        None => Url::parse(raw),
    };
    match resolved {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => {
            Some(url)
        }
        Ok(_) => None,
        Err(e) => {
            warn!("Error processing link {raw}: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager(mode: CrawlMode) -> GraphManager {
        let manager = GraphManager::new(GraphConfig {
            mode,
            max_depth: 2,
            ..GraphConfig::default()
        });
        manager.initialize_seeds(&["https://a.test/links".to_string()]);
        manager
    }

    #[test]
    fn test_single_domain_rejects_other_hosts() {
        let manager = manager(CrawlMode::SingleDomain);
        let links = vec![
            "https://a.test/p1".to_string(),
            "https://b.test/p2".to_string(),
        ];
        let discovered = manager.extract_links("https://a.test/links", &links, "");

        assert_eq!(discovered.len(), 1);
        assert_eq!(discovered[0].url, "https://a.test/p1");
        assert_eq!(discovered[0].depth, 1);
    }

    #[test]
    fn test_whitelist_mode_allows_only_listed_hosts() {
        let graph_manager = GraphManager::new(GraphConfig {
            mode: CrawlMode::Whitelist,
            allowed_domains: ["b.test".to_string()].into_iter().collect(),
            ..GraphConfig::default()
        });
        graph_manager.initialize_seeds(&["https://a.test/".to_string()]);

        let (allow, _) = graph_manager.should_crawl_domain("b.test");
        assert!(allow);
        let (allow, reason) = graph_manager.should_crawl_domain("c.test");
        assert!(!allow);
        assert!(reason.contains("whitelist"));
    }

    #[test]
    fn test_blocked_host_rejected_in_any_mode() {
        let graph_manager = GraphManager::new(GraphConfig {
            mode: CrawlMode::Graph,
            blocked_domains: ["spam.test".to_string()].into_iter().collect(),
            ..GraphConfig::default()
        });
        let (allow, reason) = graph_manager.should_crawl_domain("spam.test");
        assert!(!allow);
        assert!(reason.contains("blocked"));
    }

    #[test]
    fn test_depth_limit_stops_expansion() {
        let manager = manager(CrawlMode::SingleDomain);

        let first = manager.extract_links(
            "https://a.test/links",
            &["https://a.test/p1".to_string()],
            "",
        );
        assert_eq!(first.len(), 1);

        let second =
            manager.extract_links("https://a.test/p1", &["https://a.test/p2".to_string()], "");
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].depth, 2);

        // p2 sits at max_depth, so its links are not expanded
        let third =
            manager.extract_links("https://a.test/p2", &["https://a.test/p3".to_string()], "");
        assert!(third.is_empty());
    }

    #[test]
    fn test_relative_links_resolve_against_source() {
        let manager = manager(CrawlMode::SingleDomain);
        let discovered =
            manager.extract_links("https://a.test/links", &["/docs/intro".to_string()], "");
        assert_eq!(discovered.len(), 1);
        assert_eq!(discovered[0].url, "https://a.test/docs/intro");
    }

    #[test]
    fn test_results_sorted_by_priority() {
        let manager = manager(CrawlMode::SingleDomain);
        let links = vec![
            "https://a.test/style.css".to_string(),
            "https://a.test/blog/post".to_string(),
            "https://a.test/admin/x".to_string(),
        ];
        let discovered = manager.extract_links("https://a.test/links", &links, "");

        let priorities: Vec<i32> = discovered.iter().map(|l| l.priority).collect();
        let mut sorted = priorities.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(priorities, sorted);
        assert_eq!(discovered[0].url, "https://a.test/blog/post");
    }

    #[test]
    fn test_score_gate_blocks_unknown_hosts_in_graph_mode() {
        let graph_manager = GraphManager::new(GraphConfig {
            mode: CrawlMode::Graph,
            min_domain_score: 0.1,
            ..GraphConfig::default()
        });
        graph_manager.initialize_seeds(&["https://a.test/".to_string()]);

        // Unknown host starts at score 0.0, below the 0.1 threshold
        let (allow, reason) = graph_manager.should_crawl_domain("new.test");
        assert!(!allow);
        assert!(reason.contains("score"));

        // Seed hosts are exempt from the score gate
        let (allow, _) = graph_manager.should_crawl_domain("a.test");
        assert!(allow);
    }

    #[test]
    fn test_seed_links_double_score_increment() {
        let graph_manager = GraphManager::new(GraphConfig {
            mode: CrawlMode::SingleDomain,
            max_depth: 3,
            ..GraphConfig::default()
        });
        graph_manager.initialize_seeds(&["https://a.test/".to_string()]);

        let discovered =
            graph_manager.extract_links("https://a.test/", &["https://a.test/p".to_string()], "");
        assert_eq!(discovered.len(), 1);

        let expected = f64::from(discovered[0].priority) / 1000.0 * 2.0;
        assert!((graph_manager.host_score("a.test") - expected).abs() < 1e-9);
    }

    #[test]
    fn test_max_domains_caps_discovery() {
        let graph_manager = GraphManager::new(GraphConfig {
            mode: CrawlMode::CrossDomain,
            max_domains: 1,
            ..GraphConfig::default()
        });
        graph_manager.initialize_seeds(&["https://a.test/".to_string()]);

        let (allow, reason) = graph_manager.should_crawl_domain("b.test");
        assert!(!allow);
        assert!(reason.contains("maximum domains"));

        // Already-discovered hosts stay crawlable
        let (allow, _) = graph_manager.should_crawl_domain("a.test");
        assert!(allow);
    }
}
