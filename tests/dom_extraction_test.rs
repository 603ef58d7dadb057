//! DOM extraction against a scripted renderer double.
//!
//! Covers tree building from a rendered body, component screenshot capture
//! and position-index linking, and the screenshot-before-DOM ordering that
//! session sharing depends on.

mod common;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use canopy_crawler::crawl_engine::CrawlContext;
use canopy_crawler::crawl_engine::{Frontier, PageResult};
use canopy_crawler::dom::DomTreeExtractor;
use canopy_crawler::features::{
    CrawlerFeature, DomExtractionFeature, FeaturePipeline, ScreenshotFeature,
};
use canopy_crawler::monitoring::MetricsCollector;
use canopy_crawler::renderer::{
    BoundingBox, LocatedElement, Renderer, RendererSession, Viewport,
};
use canopy_crawler::{parse_html, PageStore};
use common::{collect_files, create_test_dir};

const RENDERED_BODY: &str = r#"<html><body id="top">
    <header class="site-header"><h1>Site</h1></header>
    <main><p>Content</p></main>
    <footer>fin</footer>
</body></html>"#;

struct FakeSession;

#[async_trait]
impl RendererSession for FakeSession {
    async fn navigate(&self, _url: &str, _timeout: Duration) -> Result<()> {
        Ok(())
    }

    async fn dismiss_consent(&self, _selectors: &[&str]) {}

    async fn full_page_screenshot(&self) -> Result<Vec<u8>> {
        Ok(b"full-page-png".to_vec())
    }

    async fn body(&self) -> Result<String> {
        Ok(RENDERED_BODY.to_string())
    }

    async fn locate(&self, selector: &str) -> Result<Vec<LocatedElement>> {
        if selector == "header" {
            Ok(vec![LocatedElement {
                rect: BoundingBox {
                    x: 0.0,
                    y: 10.0,
                    width: 800.0,
                    height: 80.0,
                },
                visible: true,
            }])
        } else {
            Ok(Vec::new())
        }
    }

    async fn bounding_boxes(&self, selectors: &[String]) -> Result<HashMap<String, BoundingBox>> {
        let mut boxes = HashMap::new();
        if selectors.iter().any(|s| s == "header.site-header") {
            boxes.insert(
                "header.site-header".to_string(),
                BoundingBox {
                    x: 0.0,
                    y: 10.0,
                    width: 800.0,
                    height: 80.0,
                },
            );
        }
        Ok(boxes)
    }

    async fn element_screenshot(&self, _rect: &BoundingBox) -> Result<Vec<u8>> {
        Ok(b"component-png".to_vec())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

struct FakeRenderer;

#[async_trait]
impl Renderer for FakeRenderer {
    async fn open(
        &self,
        _viewport: Viewport,
        _user_agent: &str,
    ) -> Result<Arc<dyn RendererSession>> {
        Ok(Arc::new(FakeSession))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

fn context(store: Arc<PageStore>) -> CrawlContext {
    CrawlContext::new(
        Arc::new(Frontier::new()),
        store,
        Arc::new(MetricsCollector::new()),
        reqwest::Client::new(),
        vec!["https://a.test/".to_string()],
        "CanopyCrawler/1.0".to_string(),
    )
}

fn success_result(url: &str) -> PageResult {
    PageResult {
        url: url.to_string(),
        content: Some(RENDERED_BODY.to_string()),
        parsed: Some(parse_html(url, RENDERED_BODY)),
        error: None,
        status: Some(200),
        response_time: 0.1,
    }
}

#[tokio::test]
async fn test_extractor_builds_and_persists_linked_tree() {
    let output = create_test_dir();
    let store = PageStore::new(output.path(), false);
    let extractor = DomTreeExtractor::new(8, true, None);

    let report = extractor
        .extract(&FakeSession, "https://a.test/page", &store)
        .await
        .expect("extraction succeeds");

    assert!(report.total_nodes > 1);
    assert_eq!(report.component_screenshots, 1);

    let files = collect_files(output.path());
    let tree_path = files
        .iter()
        .find(|p| p.file_name().is_some_and(|n| n == "dom_trees.json"))
        .expect("dom tree persisted");
    assert!(files
        .iter()
        .any(|p| p.to_string_lossy().contains("component_screenshots")));

    let json: serde_json::Value = serde_json::from_slice(
        &std::fs::read(output.path().join(tree_path)).expect("tree readable"),
    )
    .expect("tree is valid JSON");

    assert_eq!(json["dom_tree"]["tag_name"], "html");
    assert!(json["metadata"]["total_nodes"].as_u64().expect("count") > 1);

    // The header node's integer origin matches the captured component, so
    // the screenshot path is linked into the tree
    let body = &json["dom_tree"]["children"][1];
    let header = body["children"]
        .as_array()
        .expect("body children")
        .iter()
        .find(|node| node["tag_name"] == "header")
        .expect("header node");
    let screenshot_path = header["screenshot_path"].as_str().expect("linked path");
    assert!(screenshot_path.contains("header_0_0_10"));
}

#[tokio::test]
async fn test_screenshot_publishes_session_for_dom_feature() {
    let output = create_test_dir();
    let store = Arc::new(PageStore::new(output.path(), false));
    let ctx = context(Arc::clone(&store));

    let mut pipeline = FeaturePipeline::new();
    pipeline.register(Arc::new(ScreenshotFeature::with_renderer(
        Arc::new(FakeRenderer),
        Viewport::default(),
    )));
    pipeline.register(Arc::new(DomExtractionFeature::new(8, true, None)));

    pipeline.initialize(&ctx).await;
    pipeline.before_crawl(&ctx).await;
    assert!(ctx.session().await.is_some(), "screenshot published the session");

    let url = "https://a.test/page";
    pipeline.process_url(url, &success_result(url), &ctx).await;
    pipeline.finalize(&ctx).await;

    let files = collect_files(output.path());
    assert!(files
        .iter()
        .any(|p| p.file_name().is_some_and(|n| n == "screenshot.png")));
    assert!(files
        .iter()
        .any(|p| p.file_name().is_some_and(|n| n == "dom_trees.json")));
    assert!(ctx.session().await.is_none(), "finalize cleared the session");
}

#[tokio::test]
async fn test_dom_feature_without_session_fails_soft() {
    let output = create_test_dir();
    let store = Arc::new(PageStore::new(output.path(), false));
    let ctx = context(Arc::clone(&store));

    let feature = DomExtractionFeature::new(8, true, None);
    let url = "https://a.test/page";
    // No screenshot feature ran, so there is no session to consume
    let result = feature.process_url(url, &success_result(url), &ctx).await;
    assert!(result.is_err());

    // The pipeline suppresses the failure
    let mut pipeline = FeaturePipeline::new();
    pipeline.register(Arc::new(DomExtractionFeature::new(8, true, None)));
    pipeline.process_url(url, &success_result(url), &ctx).await;
}
