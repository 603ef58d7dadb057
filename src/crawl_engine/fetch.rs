//! HTTP fetching
//!
//! A single fetch attempt against the shared client, classified into the
//! crawl error taxonomy, with the rate limiter notified on every outcome so
//! adaptive delays see each attempt individually.

use std::sync::Arc;
use std::time::Instant;

use log::debug;

use crate::errors::CrawlError;
use crate::parser::{parse_html, ParsedPage};
use crate::politeness::RateLimiter;

/// The outcome of crawling one URL, handed to every feature.
#[derive(Debug, Clone, Default)]
pub struct PageResult {
    pub url: String,
    pub content: Option<String>,
    pub parsed: Option<ParsedPage>,
    pub error: Option<String>,
    pub status: Option<u16>,
    pub response_time: f64,
}

impl PageResult {
    /// Whether the fetch produced a usable body.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.content.is_some()
    }
}

/// Successful response body plus timing.
pub struct FetchedPage {
    pub body: String,
    pub status: u16,
    pub response_time: f64,
}

/// Perform one fetch attempt.
///
/// The rate limiter's `request_completed` fires exactly once per attempt,
/// whatever the outcome, so 429s and slow responses adapt the host delay
/// even when the attempt is retried.
pub async fn fetch_once(
    http: &reqwest::Client,
    rate_limiter: &Arc<RateLimiter>,
    url: &str,
) -> Result<FetchedPage, CrawlError> {
    let started = Instant::now();

    let response = match http.get(url).send().await {
        Ok(response) => response,
        Err(e) => {
            let response_time = started.elapsed().as_secs_f64();
            rate_limiter.request_completed(url, response_time, 0).await;
            return Err(CrawlError::from_reqwest(&e));
        }
    };

    let status = response.status().as_u16();

    if !response.status().is_success() {
        let response_time = started.elapsed().as_secs_f64();
        rate_limiter.request_completed(url, response_time, status).await;
        return Err(CrawlError::HttpStatus {
            status,
            url: url.to_string(),
        });
    }

    match response.text().await {
        Ok(body) => {
            let response_time = started.elapsed().as_secs_f64();
            rate_limiter.request_completed(url, response_time, status).await;
            debug!("Fetched {url}: HTTP {status}, {} bytes in {response_time:.2}s", body.len());
            Ok(FetchedPage {
                body,
                status,
                response_time,
            })
        }
        Err(e) => {
            let response_time = started.elapsed().as_secs_f64();
            rate_limiter.request_completed(url, response_time, 0).await;
            Err(CrawlError::from_reqwest(&e))
        }
    }
}

/// Turn a successful fetch into the result features consume.
#[must_use]
pub fn success_result(url: &str, fetched: FetchedPage) -> PageResult {
    let parsed = parse_html(url, &fetched.body);
    PageResult {
        url: url.to_string(),
        content: Some(fetched.body),
        parsed: Some(parsed),
        error: None,
        status: Some(fetched.status),
        response_time: fetched.response_time,
    }
}

/// Turn a terminal fetch error into the result features consume.
#[must_use]
pub fn error_result(url: &str, error: &CrawlError) -> PageResult {
    let status = match error {
        CrawlError::HttpStatus { status, .. } => Some(*status),
        _ => None,
    };
    PageResult {
        url: url.to_string(),
        content: None,
        parsed: None,
        error: Some(error.to_string()),
        status,
        response_time: 0.0,
    }
}
