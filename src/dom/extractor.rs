//! DOM tree extraction and component screenshots
//!
//! Builds a [`DomNode`] tree from the post-render DOM, captures element
//! screenshots for a configured selector list, and links captured images
//! back to tree nodes through an integer-origin position index.
//!
//! Tree building is synchronous (the scraper DOM is not `Send`); geometry
//! and pixels come from the renderer session afterwards.

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use chrono::Utc;
use log::{debug, info, warn};
use scraper::{ElementRef, Html};

use super::{DomNode, DomTreeDocument, DomTreeMetadata};
use crate::renderer::{BoundingBox, RendererSession};
use crate::storage::{ArtifactKind, PageStore};
use crate::utils::extract_host;

/// Selector list used for component screenshots when none is configured:
/// semantic HTML5 elements, common class/id components, and leaf tags that
/// usually carry meaningful content.
#[must_use]
pub fn default_component_selectors() -> Vec<String> {
    [
        "header", "nav", "main", "article", "section", "aside", "footer",
        ".container", ".content", ".card", ".navbar", ".hero", ".banner",
        "#header", "#navigation", "#main", "#sidebar", "#footer",
        "h1", "h2", "h3", "div", "body",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// What an extraction produced.
pub struct DomExtractionReport {
    pub total_nodes: usize,
    pub component_screenshots: usize,
}

/// Extracts DOM trees and component screenshots through a renderer session.
pub struct DomTreeExtractor {
    max_depth: usize,
    capture_screenshots: bool,
    component_selectors: Vec<String>,
}

impl DomTreeExtractor {
    #[must_use]
    pub fn new(
        max_depth: usize,
        capture_screenshots: bool,
        component_selectors: Option<Vec<String>>,
    ) -> Self {
        Self {
            max_depth,
            capture_screenshots,
            component_selectors: component_selectors
                .unwrap_or_else(default_component_selectors),
        }
    }

    /// Extract the tree for `url`, persist it, and return counts.
    pub async fn extract(
        &self,
        session: &dyn RendererSession,
        url: &str,
        store: &PageStore,
    ) -> Result<DomExtractionReport> {
        info!("Extracting DOM tree for {url}");

        let body = session.body().await?;
        let (mut root, selectors) = build_tree(&body, self.max_depth);

        // One round trip resolves geometry for every distinct node selector
        let selector_list: Vec<String> = selectors.into_iter().collect();
        match session.bounding_boxes(&selector_list).await {
            Ok(boxes) => attach_bounding_boxes(&mut root, &boxes),
            Err(e) => warn!("Bounding box lookup failed for {url}: {e}"),
        }

        let mut position_index: HashMap<(i64, i64), String> = HashMap::new();
        if self.capture_screenshots {
            position_index = self.capture_components(session, url, store).await;
            attach_screenshot_paths(&mut root, &position_index);
        }

        let total_nodes = root.count_nodes();
        let document = DomTreeDocument {
            url: url.to_string(),
            host: extract_host(url),
            metadata: DomTreeMetadata {
                total_nodes,
                max_depth: root.max_depth(),
                component_screenshots: position_index.len(),
                extraction_timestamp: Utc::now().to_rfc3339(),
            },
            dom_tree: root,
        };

        let json = serde_json::to_vec_pretty(&document)?;
        store.save(url, json, ArtifactKind::DomTree, None).await?;
        info!("DOM tree extracted with {total_nodes} nodes for {url}");

        Ok(DomExtractionReport {
            total_nodes,
            component_screenshots: position_index.len(),
        })
    }

    /// Capture every visible match of the component selector list.
    ///
    /// Returns the position index mapping an element's integer origin to the
    /// stored screenshot path.
    async fn capture_components(
        &self,
        session: &dyn RendererSession,
        url: &str,
        store: &PageStore,
    ) -> HashMap<(i64, i64), String> {
        let mut index = HashMap::new();

        for selector in &self.component_selectors {
            let elements = match session.locate(selector).await {
                Ok(elements) => elements,
                Err(e) => {
                    debug!("Locate failed for {selector}: {e}");
                    continue;
                }
            };

            for (ordinal, element) in elements.iter().enumerate() {
                if !element.visible || !element.rect.has_area() {
                    continue;
                }

                let bytes = match session.element_screenshot(&element.rect).await {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        debug!("Component capture failed for {selector}[{ordinal}]: {e}");
                        continue;
                    }
                };

                let (x, y) = element.rect.origin_key();
                let name = component_file_name(selector, ordinal, x, y);
                match store
                    .save(url, bytes, ArtifactKind::ComponentScreenshot, Some(&name))
                    .await
                {
                    Ok(path) => {
                        index.insert((x, y), path.to_string_lossy().into_owned());
                    }
                    Err(e) => warn!("Failed to store component screenshot {name}: {e}"),
                }
            }
        }

        index
    }
}

/// Filename stem encoding selector, ordinal, and integer origin.
#[must_use]
pub fn component_file_name(selector: &str, ordinal: usize, x: i64, y: i64) -> String {
    format!("{}_{ordinal}_{x}_{y}", sanitize_selector(selector))
}

fn sanitize_selector(selector: &str) -> String {
    let mut safe = selector
        .replace('#', "id_")
        .replace('.', "class_")
        .replace([' ', '>', '+', '~', '[', ']', '=', ':'], "_")
        .replace(['"', '\''], "");
    while safe.contains("__") {
        safe = safe.replace("__", "_");
    }
    safe.trim_matches('_').to_string()
}

/// Build the node tree and collect the distinct selectors it references.
fn build_tree(html: &str, max_depth: usize) -> (DomNode, HashSet<String>) {
    let document = Html::parse_document(html);
    let mut selectors = HashSet::new();

    let root = document.root_element();
    let node = build_node(root, 0, max_depth, "", &mut selectors);
    (node, selectors)
}

fn build_node(
    element: ElementRef<'_>,
    depth: usize,
    max_depth: usize,
    parent_xpath: &str,
    selectors: &mut HashSet<String>,
) -> DomNode {
    let value = element.value();
    let tag_name = value.name().to_string();

    let element_id = value.attr("id").map(String::from);
    let class_names: Vec<String> = value.classes().map(String::from).collect();
    let attributes: HashMap<String, String> = value
        .attrs()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    // Direct text only: text nodes that are immediate children
    let direct_text: String = element
        .children()
        .filter_map(|child| child.value().as_text().map(|t| t.to_string()))
        .collect::<String>()
        .trim()
        .to_string();
    let text_content = (!direct_text.is_empty()).then_some(direct_text);

    let css_selector = node_selector(&tag_name, element_id.as_deref(), &class_names);
    if let Some(selector) = &css_selector {
        selectors.insert(selector.clone());
    }

    let xpath = node_xpath(element, &tag_name, parent_xpath);

    let hash_input = format!(
        "{tag_name}_{}_{}_{}",
        element_id.as_deref().unwrap_or(""),
        class_names.join("."),
        text_content.as_deref().unwrap_or("")
    );
    let node_hash = format!("{:x}", md5::compute(hash_input.as_bytes()))[..12].to_string();

    let children = if depth < max_depth {
        element
            .children()
            .filter_map(ElementRef::wrap)
            .map(|child| build_node(child, depth + 1, max_depth, &xpath, selectors))
            .collect()
    } else {
        Vec::new()
    };

    DomNode {
        tag_name,
        element_id,
        class_names,
        attributes,
        text_content,
        children,
        xpath,
        css_selector,
        bounding_box: None,
        screenshot_path: None,
        node_hash,
        depth,
    }
}

/// `#id` when present, otherwise `tag.class1.class2`.
fn node_selector(tag: &str, id: Option<&str>, classes: &[String]) -> Option<String> {
    if let Some(id) = id {
        if !id.is_empty() {
            return Some(format!("#{id}"));
        }
    }
    if classes.is_empty() {
        Some(tag.to_string())
    } else {
        Some(format!("{tag}.{}", classes.join(".")))
    }
}

fn node_xpath(element: ElementRef<'_>, tag: &str, parent_xpath: &str) -> String {
    let same_tag_siblings: Vec<_> = element
        .parent()
        .map(|parent| {
            parent
                .children()
                .filter_map(ElementRef::wrap)
                .filter(|sibling| sibling.value().name() == tag)
                .collect()
        })
        .unwrap_or_default();

    let step = if same_tag_siblings.len() > 1 {
        let position = same_tag_siblings
            .iter()
            .position(|sibling| sibling.id() == element.id())
            .map_or(1, |i| i + 1);
        format!("{tag}[{position}]")
    } else {
        tag.to_string()
    };

    format!("{parent_xpath}/{step}")
}

fn attach_bounding_boxes(node: &mut DomNode, boxes: &HashMap<String, BoundingBox>) {
    if let Some(selector) = &node.css_selector {
        if let Some(rect) = boxes.get(selector) {
            node.bounding_box = Some(*rect);
        }
    }
    for child in &mut node.children {
        attach_bounding_boxes(child, boxes);
    }
}

fn attach_screenshot_paths(node: &mut DomNode, index: &HashMap<(i64, i64), String>) {
    if let Some(rect) = &node.bounding_box {
        if let Some(path) = index.get(&rect.origin_key()) {
            node.screenshot_path = Some(path.clone());
        }
    }
    for child in &mut node.children {
        attach_screenshot_paths(child, index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body id="top">
        <header class="site-header"><h1>Title</h1></header>
        <main><p>First</p><p>Second</p></main>
        <footer>done</footer>
    </body></html>"#;

    #[test]
    fn test_tree_root_is_html() {
        let (root, _) = build_tree(PAGE, 8);
        assert_eq!(root.tag_name, "html");
        assert!(root.count_nodes() > 1);
    }

    #[test]
    fn test_direct_text_excludes_descendants() {
        let (root, _) = build_tree(PAGE, 8);
        let body = &root.children[root.children.len() - 1];
        assert_eq!(body.tag_name, "body");
        // body has no direct text of its own
        assert!(body.text_content.is_none());

        let footer = body
            .children
            .iter()
            .find(|c| c.tag_name == "footer")
            .expect("footer exists");
        assert_eq!(footer.text_content.as_deref(), Some("done"));
    }

    #[test]
    fn test_selectors_prefer_id_then_classes() {
        let (root, selectors) = build_tree(PAGE, 8);
        let body = root.children.last().expect("body exists");
        assert_eq!(body.css_selector.as_deref(), Some("#top"));

        let header = body
            .children
            .iter()
            .find(|c| c.tag_name == "header")
            .expect("header exists");
        assert_eq!(header.css_selector.as_deref(), Some("header.site-header"));
        assert!(selectors.contains("header.site-header"));
    }

    #[test]
    fn test_xpath_indexes_repeated_siblings() {
        let (root, _) = build_tree(PAGE, 8);
        let body = root.children.last().expect("body exists");
        let main = body
            .children
            .iter()
            .find(|c| c.tag_name == "main")
            .expect("main exists");

        let xpaths: Vec<&str> = main.children.iter().map(|c| c.xpath.as_str()).collect();
        assert!(xpaths[0].ends_with("/p[1]"));
        assert!(xpaths[1].ends_with("/p[2]"));
    }

    #[test]
    fn test_depth_cap_stops_traversal() {
        let (root, _) = build_tree(PAGE, 1);
        // html(0) -> body(1), but body's children are cut off
        let body = root.children.last().expect("body exists");
        assert!(body.children.is_empty());
    }

    #[test]
    fn test_node_hash_is_12_hex() {
        let (root, _) = build_tree(PAGE, 8);
        assert_eq!(root.node_hash.len(), 12);
        assert!(root.node_hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_position_index_attaches_paths() {
        let (mut root, _) = build_tree(PAGE, 8);
        let mut boxes = HashMap::new();
        boxes.insert(
            "#top".to_string(),
            BoundingBox {
                x: 10.4,
                y: 20.9,
                width: 100.0,
                height: 50.0,
            },
        );
        attach_bounding_boxes(&mut root, &boxes);

        let mut index = HashMap::new();
        index.insert((10, 20), "shots/body.png".to_string());
        attach_screenshot_paths(&mut root, &index);

        let body = root.children.last().expect("body exists");
        assert_eq!(body.screenshot_path.as_deref(), Some("shots/body.png"));
    }

    #[test]
    fn test_component_file_name_encoding() {
        assert_eq!(component_file_name("header", 0, 0, 12), "header_0_0_12");
        assert_eq!(
            component_file_name(".site-nav", 2, 15, 30),
            "class_site-nav_2_15_30"
        );
        assert_eq!(component_file_name("#main", 0, 5, 5), "id_main_0_5_5");
    }
}
