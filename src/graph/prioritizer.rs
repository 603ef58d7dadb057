//! Link prioritization
//!
//! Maps a discovered link to an integer priority. Base 100, adjusted by host
//! sets, same-host affinity, depth, file extension, URL patterns, link text,
//! and configured keywords in the source page body. A result of -1000 is a
//! hard rejection (blocked host or blocked binary extension); anything at or
//! below zero is dropped from the frontier.

use std::collections::HashSet;

use once_cell::sync::Lazy;

use super::{CrawlMode, GraphConfig, LinkInfo};
use crate::utils::{extract_host, file_extension};

/// Hard rejection score for blocked hosts and binary payloads.
pub const REJECT: i32 = -1000;

static HIGH_PRIORITY_EXTENSIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [".html", ".htm", ".php", ".asp", ".aspx", ".jsp", ""].into_iter().collect()
});
static MEDIUM_PRIORITY_EXTENSIONS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| [".pdf", ".doc", ".docx", ".txt"].into_iter().collect());
static LOW_PRIORITY_EXTENSIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [".jpg", ".jpeg", ".png", ".gif", ".css", ".js"].into_iter().collect()
});
static BLOCKED_EXTENSIONS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| [".zip", ".exe", ".dmg", ".iso", ".tar", ".gz"].into_iter().collect());

const HIGH_PRIORITY_PATTERNS: [&str; 9] = [
    "/blog/", "/news/", "/article/", "/post/", "/content/",
    "/research/", "/publications/", "/papers/", "/docs/",
];
const LOW_PRIORITY_PATTERNS: [&str; 9] = [
    "/admin/", "/login/", "/register/", "/cart/", "/checkout/",
    "/api/", "/ajax/", "/json/", "/xml/",
];

const POSITIVE_TEXT_KEYWORDS: [&str; 4] = ["article", "blog", "news", "read more"];
const NEGATIVE_TEXT_KEYWORDS: [&str; 4] = ["login", "register", "cart", "buy now"];

/// Computes crawl priorities for discovered links.
pub struct LinkPrioritizer {
    config: GraphConfig,
}

impl LinkPrioritizer {
    #[must_use]
    pub fn new(config: GraphConfig) -> Self {
        Self { config }
    }

    /// Priority for a link, given the body of the page it was found on.
    ///
    /// Returns [`REJECT`] for blocked hosts and blocked binary extensions;
    /// otherwise the adjusted score floored at zero.
    #[must_use]
    pub fn calculate_priority(&self, link: &LinkInfo, page_body: &str) -> i32 {
        let mut priority = 100i32;
        let url = link.url.to_lowercase();
        let host = link.host.to_lowercase();

        // Host-set scoring
        if self.config.priority_domains.contains(&host) {
            priority += 200;
        } else if self.config.allowed_domains.contains(&host)
            && self.config.mode == CrawlMode::Whitelist
        {
            priority += 100;
        } else if self.config.blocked_domains.contains(&host) {
            return REJECT;
        }

        if host == extract_host(&link.source_url) {
            priority += 150;
        }

        priority -= (link.depth as i32) * 50;

        let extension = file_extension(&url);
        if BLOCKED_EXTENSIONS.contains(extension.as_str()) {
            return REJECT;
        } else if HIGH_PRIORITY_EXTENSIONS.contains(extension.as_str()) {
            priority += 50;
        } else if MEDIUM_PRIORITY_EXTENSIONS.contains(extension.as_str()) {
            priority += 20;
        } else if LOW_PRIORITY_EXTENSIONS.contains(extension.as_str()) {
            priority -= 30;
        }

        if HIGH_PRIORITY_PATTERNS.iter().any(|p| url.contains(p)) {
            priority += 30;
        }
        if LOW_PRIORITY_PATTERNS.iter().any(|p| url.contains(p)) {
            priority -= 50;
        }

        if !link.link_text.is_empty() {
            let text = link.link_text.to_lowercase();
            if POSITIVE_TEXT_KEYWORDS.iter().any(|k| text.contains(k)) {
                priority += 25;
            }
            if NEGATIVE_TEXT_KEYWORDS.iter().any(|k| text.contains(k)) {
                priority -= 25;
            }
        }

        if !self.config.keyword_filters.is_empty() && !page_body.is_empty() {
            let body = page_body.to_lowercase();
            let matches = self
                .config
                .keyword_filters
                .iter()
                .filter(|k| body.contains(&k.to_lowercase()))
                .count();
            priority += (matches as i32) * 25;
        }

        priority.max(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(url: &str, source: &str, depth: usize) -> LinkInfo {
        LinkInfo {
            url: url.to_string(),
            source_url: source.to_string(),
            host: extract_host(url),
            depth,
            priority: 0,
            link_text: String::new(),
        }
    }

    #[test]
    fn test_blocked_host_is_hard_rejected() {
        let config = GraphConfig {
            blocked_domains: ["spam.test".to_string()].into_iter().collect(),
            ..GraphConfig::default()
        };
        let prioritizer = LinkPrioritizer::new(config);
        let priority =
            prioritizer.calculate_priority(&link("https://spam.test/x", "https://ok.test/", 1), "");
        assert_eq!(priority, REJECT);
    }

    #[test]
    fn test_blocked_extension_is_hard_rejected() {
        let prioritizer = LinkPrioritizer::new(GraphConfig::default());
        let priority = prioritizer
            .calculate_priority(&link("https://a.test/file.exe", "https://a.test/", 1), "");
        assert_eq!(priority, REJECT);
        let priority = prioritizer
            .calculate_priority(&link("https://a.test/bundle.zip", "https://a.test/", 1), "");
        assert_eq!(priority, REJECT);
    }

    #[test]
    fn test_same_host_html_link_scores_high() {
        let prioritizer = LinkPrioritizer::new(GraphConfig::default());
        // base 100 + same host 150 - depth 50 + extensionless 50
        let priority = prioritizer
            .calculate_priority(&link("https://a.test/about", "https://a.test/", 1), "");
        assert_eq!(priority, 250);
    }

    #[test]
    fn test_priority_domain_bonus() {
        let config = GraphConfig {
            priority_domains: ["vip.test".to_string()].into_iter().collect(),
            ..GraphConfig::default()
        };
        let prioritizer = LinkPrioritizer::new(config);
        let boosted = prioritizer
            .calculate_priority(&link("https://vip.test/page", "https://a.test/", 1), "");
        let plain = prioritizer
            .calculate_priority(&link("https://other.test/page", "https://a.test/", 1), "");
        assert_eq!(boosted - plain, 200);
    }

    #[test]
    fn test_url_pattern_adjustments() {
        let prioritizer = LinkPrioritizer::new(GraphConfig::default());
        let blog = prioritizer
            .calculate_priority(&link("https://a.test/blog/post-1", "https://a.test/", 1), "");
        let admin = prioritizer
            .calculate_priority(&link("https://a.test/admin/users", "https://a.test/", 1), "");
        assert_eq!(blog - admin, 80);
    }

    #[test]
    fn test_depth_penalty_floors_at_zero() {
        let prioritizer = LinkPrioritizer::new(GraphConfig::default());
        let priority = prioritizer
            .calculate_priority(&link("https://b.test/x.jpg", "https://a.test/", 5), "");
        assert_eq!(priority, 0);
    }

    #[test]
    fn test_link_text_heuristics() {
        let prioritizer = LinkPrioritizer::new(GraphConfig::default());
        let mut positive = link("https://a.test/p", "https://a.test/", 1);
        positive.link_text = "Read more about this".to_string();
        let mut negative = link("https://a.test/p", "https://a.test/", 1);
        negative.link_text = "Buy now".to_string();

        let up = prioritizer.calculate_priority(&positive, "");
        let down = prioritizer.calculate_priority(&negative, "");
        assert_eq!(up - down, 50);
    }

    #[test]
    fn test_keyword_filter_bonus_per_match() {
        let config = GraphConfig {
            keyword_filters: vec!["rust".to_string(), "crawler".to_string()],
            ..GraphConfig::default()
        };
        let prioritizer = LinkPrioritizer::new(config);
        let l = link("https://a.test/p", "https://a.test/", 1);

        let none = prioritizer.calculate_priority(&l, "nothing relevant here");
        let both = prioritizer.calculate_priority(&l, "a Rust crawler appears");
        assert_eq!(both - none, 50);
    }
}
