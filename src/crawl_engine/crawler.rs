//! Main crawl loop
//!
//! Drives the frontier: dedup check, robots check, politeness wait, fetch
//! under retry, content-novelty check, metrics, then the feature fan-out.
//! The loop is a single cooperative task; per-host politeness and the
//! shared state components carry their own locks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use serde::Serialize;

use super::context::CrawlContext;
use super::fetch::{error_result, fetch_once, success_result};
use super::frontier::Frontier;
use crate::config::CrawlConfig;
use crate::dedup::{DedupManager, DedupStats};
use crate::errors::{CrawlError, ErrorHandler, ErrorSummary};
use crate::features::{
    CrawlerFeature, CssDownloadFeature, DomExtractionFeature, FeaturePipeline,
    GraphExpansionFeature, ScreenshotFeature,
};
use crate::monitoring::{FinalReport, MetricsCollector, ProgressReporter};
use crate::politeness::{RateLimiter, RobotsPolicy};
use crate::storage::{ArtifactKind, PageStore};
use crate::utils::constants::SEED_PRIORITY;
use crate::utils::extract_host;

/// Cooperative stop signal for a running crawl.
#[derive(Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    /// Ask the crawl loop to stop dequeuing and finalize.
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// What a finished crawl returns.
#[derive(Debug, Serialize)]
pub struct CrawlSummary {
    pub pages_crawled: usize,
    pub report: FinalReport,
    pub dedup: DedupStats,
    pub errors: ErrorSummary,
}

/// The crawling control plane: frontier, politeness, dedup, features.
pub struct Crawler {
    config: CrawlConfig,
    http: reqwest::Client,
    frontier: Arc<Frontier>,
    dedup: Arc<DedupManager>,
    robots: Arc<RobotsPolicy>,
    rate_limiter: Arc<RateLimiter>,
    errors: Arc<ErrorHandler>,
    metrics: Arc<MetricsCollector>,
    reporter: ProgressReporter,
    storage: Arc<PageStore>,
    pipeline: FeaturePipeline,
    context: CrawlContext,
    shutdown: ShutdownHandle,
}

impl Crawler {
    /// Build a crawler from configuration.
    ///
    /// Feature registration order is fixed: screenshot, DOM extraction,
    /// graph expansion, CSS download. The configuration layer has already
    /// validated feature combinations.
    pub fn new(config: CrawlConfig) -> Result<Self, CrawlError> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .user_agent(config.user_agent().to_string())
            .timeout(Duration::from_secs(config.request_timeout_secs()))
            .build()
            .map_err(|e| CrawlError::Config(format!("failed to build HTTP client: {e}")))?;

        let frontier = Arc::new(Frontier::new());
        let storage = Arc::new(PageStore::new(config.storage_root(), config.compress()));
        let metrics = Arc::new(MetricsCollector::new());
        let rate_limiter = Arc::new(RateLimiter::new(
            config.default_delay(),
            config.max_concurrent_per_host(),
        ));
        let robots = Arc::new(RobotsPolicy::new(
            http.clone(),
            config.user_agent().to_string(),
            Duration::from_secs(config.robots_timeout_secs()),
        ));
        let errors = Arc::new(ErrorHandler::new(
            config.retry().clone(),
            config.failure_threshold(),
            Duration::from_secs(config.recovery_timeout_secs()),
        ));
        let dedup = Arc::new(DedupManager::new(
            config.use_bloom(),
            config.bloom_capacity(),
        ));
        let reporter = ProgressReporter::new(
            Arc::clone(&metrics),
            Duration::from_secs(config.report_interval_secs()),
        );

        let context = CrawlContext::new(
            Arc::clone(&frontier),
            Arc::clone(&storage),
            Arc::clone(&metrics),
            http.clone(),
            config.start_urls().to_vec(),
            config.user_agent().to_string(),
        );

        let mut pipeline = FeaturePipeline::new();
        if let Some(options) = config.screenshots() {
            pipeline.register(Arc::new(ScreenshotFeature::new(
                options.viewport,
                options.headless,
            )) as Arc<dyn CrawlerFeature>);
        }
        if let Some(options) = config.dom_extraction() {
            pipeline.register(Arc::new(DomExtractionFeature::new(
                options.max_depth,
                options.capture_screenshots,
                options.component_selectors.clone(),
            )));
        }
        if let Some(graph_config) = config.graph() {
            pipeline.register(Arc::new(GraphExpansionFeature::new(graph_config.clone())));
        }
        if let Some(options) = config.css_download() {
            pipeline.register(Arc::new(CssDownloadFeature::new(options.max_css_files)));
        }

        Ok(Self {
            config,
            http,
            frontier,
            dedup,
            robots,
            rate_limiter,
            errors,
            metrics,
            reporter,
            storage,
            pipeline,
            context,
            shutdown: ShutdownHandle {
                flag: Arc::new(AtomicBool::new(false)),
            },
        })
    }

    /// Handle for stopping the crawl from another task.
    #[must_use]
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    #[must_use]
    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    /// Run the crawl to completion.
    ///
    /// Returns when the frontier drains, the page budget is reached, or a
    /// shutdown is requested. Feature finalization and the final report
    /// always run on the way out.
    pub async fn crawl(&self) -> Result<CrawlSummary, CrawlError> {
        info!(
            "Starting crawl: {} seeds, max {} pages, features: {:?}",
            self.config.start_urls().len(),
            self.config.max_pages(),
            self.pipeline.names()
        );

        // Prime robots state for the seed hosts before the loop starts
        for url in self.config.start_urls() {
            let host = extract_host(url);
            self.robots.ensure_host(&host, &self.rate_limiter).await;
        }

        self.reporter.start();
        self.pipeline.initialize(&self.context).await;
        self.pipeline.before_crawl(&self.context).await;

        let pages_crawled = self.crawl_loop().await;

        self.reporter.stop();
        self.pipeline.finalize(&self.context).await;

        for host in self.rate_limiter.host_stats().await {
            info!(
                "Host {}: delay {:.1}s, {} recent requests, {:.2}s avg response",
                host.host, host.crawl_delay, host.recent_requests, host.avg_response_time
            );
        }

        self.reporter.print_now();
        let summary = CrawlSummary {
            pages_crawled,
            report: self.reporter.final_report(),
            dedup: self.dedup.stats(),
            errors: self.errors.summary(),
        };
        if let Err(e) = self
            .storage
            .save_report("final_crawl_metrics.json", &summary)
            .await
        {
            warn!("Failed to persist final metrics report: {e:#}");
        }

        info!("Crawl finished: {pages_crawled} pages");
        Ok(summary)
    }

    async fn crawl_loop(&self) -> usize {
        for url in self.config.start_urls() {
            self.frontier.enqueue(url, SEED_PRIORITY);
        }

        let mut pages_crawled = 0usize;

        while pages_crawled < self.config.max_pages() {
            if self.shutdown.is_shutdown() {
                info!("Shutdown requested, stopping crawl loop");
                break;
            }

            let Some(entry) = self.frontier.dequeue() else {
                break;
            };
            let url = entry.url;
            self.metrics.update_queue_depth(self.frontier.len());

            // URL-level dedup
            let decision = self.dedup.should_crawl(&url);
            if !decision.accept {
                info!("Skipping duplicate URL {url}: {}", decision.reason);
                self.metrics.record_duplicate_skipped(&url);
                continue;
            }
            let canonical_url = decision.canonical_url;

            // robots.txt
            let host = extract_host(&url);
            self.robots.ensure_host(&host, &self.rate_limiter).await;
            let (allowed, reason) = self.robots.can_crawl(&url);
            if !allowed {
                warn!("Cannot crawl {url}: {reason}");
                self.metrics.record_error(&url, &reason, None);
                continue;
            }

            // Politeness
            self.rate_limiter.wait(&url).await;

            // Fetch under retry and the per-host circuit breaker
            let fetch_outcome = self
                .errors
                .execute_with_retry(
                    || fetch_once(&self.http, &self.rate_limiter, &url),
                    &url,
                    &host,
                )
                .await;

            let result = match fetch_outcome {
                Ok(fetched) => {
                    // The fetch used the URL as discovered; everything
                    // downstream is keyed by its canonical form
                    let mut result = success_result(&url, fetched);
                    result.url = canonical_url.clone();

                    // The HTML body and metadata are kept even for duplicate
                    // content; only the downstream artifacts are skipped
                    self.persist_page(&canonical_url, &result).await;

                    // Content-level dedup: only the first sighting of a body
                    // goes through the feature pipeline
                    if let Some(body) = &result.content {
                        let (duplicate, first_url) =
                            self.dedup
                                .is_duplicate_content(body, &canonical_url, ArtifactKind::Html);
                        if duplicate {
                            info!(
                                "Skipping duplicate content at {url} (same as {})",
                                first_url.unwrap_or_default()
                            );
                            self.metrics.record_duplicate_skipped(&url);
                            continue;
                        }
                    }

                    self.metrics.record_page_crawled(
                        &url,
                        result.response_time,
                        result.status.unwrap_or(0),
                        result.content.as_ref().map_or(0, String::len),
                    );
                    result
                }
                Err(error) => {
                    self.metrics.record_error(
                        &url,
                        &error.to_string(),
                        match &error {
                            CrawlError::HttpStatus { status, .. } => Some(*status),
                            _ => None,
                        },
                    );
                    error_result(&canonical_url, &error)
                }
            };

            self.pipeline
                .process_url(&canonical_url, &result, &self.context)
                .await;

            self.frontier.mark_visited(&url);
            pages_crawled += 1;
            info!("Crawled ({pages_crawled}/{}): {url}", self.config.max_pages());
        }

        pages_crawled
    }

    /// Persist the HTML body and page metadata.
    ///
    /// Storage failures drop the artifact, not the URL: the page still flows
    /// through the feature pipeline.
    async fn persist_page(&self, url: &str, result: &super::fetch::PageResult) {
        if let Err(e) = self.storage.save_page_metadata(url).await {
            warn!("Failed to save metadata for {url}: {e:#}");
        }
        if let Some(body) = &result.content {
            if let Err(e) = self
                .storage
                .save(url, body.clone().into_bytes(), ArtifactKind::Html, None)
                .await
            {
                warn!("Failed to save HTML for {url}: {e:#}");
            }
        }
    }
}
