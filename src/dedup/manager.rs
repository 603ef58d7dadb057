//! Combined URL and content deduplication
//!
//! Single decision point for "should this URL be crawled" and "is this body
//! novel". URL identity is the canonical form; a bloom pre-filter
//! short-circuits the common unseen case before the authoritative set is
//! consulted.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use log::info;
use parking_lot::Mutex;
use serde::Serialize;

use super::bloom::BloomFilter;
use super::canonicalizer::canonicalize;
use super::content_hasher::ContentHasher;
use crate::storage::ArtifactKind;
use crate::utils::constants::VISITED_WATERMARK;

/// Outcome of a `should_crawl` check.
#[derive(Debug, Clone)]
pub struct CrawlDecision {
    pub accept: bool,
    pub canonical_url: String,
    pub reason: String,
}

/// Aggregate dedup counters.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DedupStats {
    pub urls_processed: u64,
    pub duplicate_urls: u64,
    pub duplicate_content: u64,
    pub canonical_urls: u64,
    pub unique_content_hashes: usize,
    pub visited_set_size: usize,
    pub bloom_enabled: bool,
}

struct DedupState {
    seen: HashSet<String>,
    // Insertion order of canonical URLs, used by the watermark truncation
    insertion_log: VecDeque<String>,
    canonical_to_original: HashMap<String, String>,
    bloom: Option<BloomFilter>,
    content: ContentHasher,
}

/// Two-layer deduplication over canonical URLs and content fingerprints.
pub struct DedupManager {
    state: Mutex<DedupState>,
    bloom_capacity: usize,
    watermark: usize,
    urls_processed: AtomicU64,
    duplicate_urls: AtomicU64,
    duplicate_content: AtomicU64,
    canonical_urls: AtomicU64,
}

impl DedupManager {
    #[must_use]
    pub fn new(use_bloom: bool, bloom_capacity: usize) -> Self {
        Self {
            state: Mutex::new(DedupState {
                seen: HashSet::new(),
                insertion_log: VecDeque::new(),
                canonical_to_original: HashMap::new(),
                bloom: use_bloom.then(|| BloomFilter::new(bloom_capacity)),
                content: ContentHasher::new(),
            }),
            bloom_capacity,
            watermark: VISITED_WATERMARK,
            urls_processed: AtomicU64::new(0),
            duplicate_urls: AtomicU64::new(0),
            duplicate_content: AtomicU64::new(0),
            canonical_urls: AtomicU64::new(0),
        }
    }

    /// Decide whether a URL should be crawled.
    ///
    /// Accepting the URL records its canonical form in the visited set and
    /// the bloom pre-filter, so a second call with an equivalent URL is
    /// rejected as a duplicate.
    pub fn should_crawl(&self, url: &str) -> CrawlDecision {
        let canonical_url = canonicalize(url);
        self.urls_processed.fetch_add(1, Ordering::Relaxed);

        let mut state = self.state.lock();

        let definitely_unseen = state
            .bloom
            .as_ref()
            .is_some_and(|bloom| !bloom.contains(&canonical_url));

        // The bloom filter only short-circuits the set lookup; a hit still
        // requires the authoritative check below.
        if !definitely_unseen && state.seen.contains(&canonical_url) {
            self.duplicate_urls.fetch_add(1, Ordering::Relaxed);
            let original = state
                .canonical_to_original
                .get(&canonical_url)
                .cloned()
                .unwrap_or_else(|| canonical_url.clone());
            return CrawlDecision {
                accept: false,
                canonical_url: canonical_url.clone(),
                reason: format!("duplicate URL (canonical: {canonical_url}, original: {original})"),
            };
        }

        state.seen.insert(canonical_url.clone());
        state.insertion_log.push_back(canonical_url.clone());
        state
            .canonical_to_original
            .insert(canonical_url.clone(), url.to_string());
        if let Some(bloom) = state.bloom.as_mut() {
            bloom.add(&canonical_url);
        }
        self.canonical_urls.fetch_add(1, Ordering::Relaxed);

        if state.seen.len() > self.watermark {
            self.truncate_visited(&mut state);
        }

        CrawlDecision {
            accept: true,
            canonical_url,
            reason: "new URL".to_string(),
        }
    }

    /// Check whether the body duplicates previously seen content.
    ///
    /// Returns `(true, Some(first_url))` for repeats; first sight records
    /// the fingerprint and returns `(false, None)`.
    pub fn is_duplicate_content(
        &self,
        body: &str,
        url: &str,
        kind: ArtifactKind,
    ) -> (bool, Option<String>) {
        let mut state = self.state.lock();
        let (duplicate, first_url) = state.content.is_duplicate_content(body, url, kind);
        if duplicate {
            self.duplicate_content.fetch_add(1, Ordering::Relaxed);
        }
        (duplicate, first_url)
    }

    /// Whether the canonical form of `url` has already been accepted.
    #[must_use]
    pub fn has_seen(&self, url: &str) -> bool {
        let canonical_url = canonicalize(url);
        self.state.lock().seen.contains(&canonical_url)
    }

    #[must_use]
    pub fn stats(&self) -> DedupStats {
        let state = self.state.lock();
        DedupStats {
            urls_processed: self.urls_processed.load(Ordering::Relaxed),
            duplicate_urls: self.duplicate_urls.load(Ordering::Relaxed),
            duplicate_content: self.duplicate_content.load(Ordering::Relaxed),
            canonical_urls: self.canonical_urls.load(Ordering::Relaxed),
            unique_content_hashes: state.content.unique_hashes(),
            visited_set_size: state.seen.len(),
            bloom_enabled: state.bloom.is_some(),
        }
    }

    /// Keep only the most recent half of the visited set.
    ///
    /// The only mutation that can reintroduce previously seen URLs; accepted
    /// as a bounded-memory trade-off on long crawls.
    fn truncate_visited(&self, state: &mut DedupState) {
        let keep = state.insertion_log.len() / 2;
        let drop_count = state.insertion_log.len() - keep;
        info!("Visited set exceeded {} entries, truncating {drop_count} oldest", self.watermark);

        for _ in 0..drop_count {
            if let Some(old) = state.insertion_log.pop_front() {
                state.seen.remove(&old);
                state.canonical_to_original.remove(&old);
            }
        }

        // The bloom filter cannot forget, so rebuild it from the survivors
        if state.bloom.is_some() {
            let mut rebuilt = BloomFilter::new(self.bloom_capacity);
            for url in &state.insertion_log {
                rebuilt.add(url);
            }
            state.bloom = Some(rebuilt);
        }
    }
}
