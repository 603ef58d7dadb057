//! Politeness properties through the public rate limiter and robots APIs.

use std::time::{Duration, Instant};

use canopy_crawler::{RateLimiter, RobotsPolicy};

#[tokio::test]
async fn test_politeness_floor_between_dispatches() {
    let limiter = RateLimiter::new(0.15, 1);

    let mut dispatch_times = Vec::new();
    for i in 0..3 {
        limiter.wait(&format!("https://a.test/{i}")).await;
        dispatch_times.push(Instant::now());
        limiter
            .request_completed(&format!("https://a.test/{i}"), 0.01, 200)
            .await;
    }

    for pair in dispatch_times.windows(2) {
        let gap = pair[1] - pair[0];
        assert!(gap >= Duration::from_millis(140), "gap {gap:?} too small");
    }
}

#[tokio::test]
async fn test_429_at_least_doubles_current_delay() {
    let limiter = RateLimiter::new(0.5, 1);

    limiter.request_completed("https://a.test/x", 0.1, 429).await;
    let after_one = limiter.crawl_delay("a.test").await;
    assert!(after_one >= 1.0);

    limiter.request_completed("https://a.test/x", 0.1, 429).await;
    assert!(limiter.crawl_delay("a.test").await >= after_one * 2.0);
}

#[tokio::test]
async fn test_host_stats_reflect_samples() {
    let limiter = RateLimiter::new(0.01, 2);
    limiter.wait("https://a.test/1").await;
    limiter.request_completed("https://a.test/1", 0.2, 200).await;
    limiter.wait("https://a.test/2").await;
    limiter.request_completed("https://a.test/2", 0.4, 200).await;

    let stats = limiter.host_stats().await;
    let host = stats.iter().find(|s| s.host == "a.test").expect("tracked");
    assert_eq!(host.recent_requests, 2);
    assert!((host.avg_response_time - 0.3).abs() < 1e-9);
    assert_eq!(host.active_requests, 0);
}

#[test]
fn test_robots_rules_apply_per_user_agent_group() {
    let policy = RobotsPolicy::new(
        reqwest::Client::new(),
        "CanopyCrawler/1.0".to_string(),
        Duration::from_secs(10),
    );

    let entry = policy.parse_host(
        "host.test",
        concat!(
            "User-agent: OtherBot\n",
            "Disallow: /\n",
            "\n",
            "User-agent: *\n",
            "Disallow: /private/\n",
            "Crawl-delay: 2\n",
        )
        .to_string(),
    );

    // The wildcard group applies to us, not OtherBot's root disallow
    assert!(entry.user_agent_allowed);
    assert_eq!(entry.crawl_delay, Some(2.0));
}
