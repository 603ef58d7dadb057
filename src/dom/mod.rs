//! DOM tree model
//!
//! Serializable tree of the post-render DOM, with per-node selectors,
//! XPaths, optional geometry, and links to component screenshots.

pub mod extractor;

pub use extractor::{default_component_selectors, DomTreeExtractor};

use std::collections::HashMap;

use serde::Serialize;

use crate::renderer::BoundingBox;

/// A single DOM node with metadata.
#[derive(Debug, Clone, Serialize, Default)]
pub struct DomNode {
    pub tag_name: String,
    pub element_id: Option<String>,
    pub class_names: Vec<String>,
    pub attributes: HashMap<String, String>,
    /// Direct text only, not descendants'
    pub text_content: Option<String>,
    pub children: Vec<DomNode>,
    pub xpath: String,
    pub css_selector: Option<String>,
    pub bounding_box: Option<BoundingBox>,
    pub screenshot_path: Option<String>,
    pub node_hash: String,
    pub depth: usize,
}

impl DomNode {
    /// Total nodes in this subtree, including self.
    #[must_use]
    pub fn count_nodes(&self) -> usize {
        1 + self.children.iter().map(DomNode::count_nodes).sum::<usize>()
    }

    /// Deepest level below this node.
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.children
            .iter()
            .map(|c| c.max_depth())
            .max()
            .map_or(self.depth, |d| d)
    }
}

/// Counts and timestamps stored alongside the tree.
#[derive(Debug, Clone, Serialize)]
pub struct DomTreeMetadata {
    pub total_nodes: usize,
    pub max_depth: usize,
    pub component_screenshots: usize,
    pub extraction_timestamp: String,
}

/// The persisted `dom_trees` artifact.
#[derive(Debug, Clone, Serialize)]
pub struct DomTreeDocument {
    pub url: String,
    pub host: String,
    pub dom_tree: DomNode,
    pub metadata: DomTreeMetadata,
}
