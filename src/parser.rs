//! HTML inventory extraction
//!
//! Produces the link/stylesheet/inline-style inventory a fetched page feeds
//! into the feature pipeline. Parsing is synchronous: the scraper DOM is not
//! `Send` and must never be held across an await point.

use std::collections::HashMap;

use log::warn;
use scraper::{Html, Selector};
use url::Url;

/// Inventory extracted from one HTML body.
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    pub title: String,
    /// Absolute http(s) links, order-preserving, deduplicated
    pub links: Vec<String>,
    /// Absolute stylesheet URLs, order-preserving, deduplicated
    pub css_links: Vec<String>,
    /// Bodies of inline `<style>` elements
    pub inline_css: Vec<String>,
    /// Meta name/property to content
    pub meta: HashMap<String, String>,
}

/// Parse an HTML body, resolving URLs against `base_url`.
#[must_use]
pub fn parse_html(base_url: &str, html: &str) -> ParsedPage {
    let document = Html::parse_document(html);
    let base = match Url::parse(base_url) {
        Ok(url) => Some(url),
        Err(e) => {
            warn!("Cannot resolve links for {base_url}: {e}");
            None
        }
    };

    let mut page = ParsedPage::default();

    if let Some(selector) = selector("title") {
        if let Some(title) = document.select(&selector).next() {
            page.title = title.text().collect::<String>().trim().to_string();
        }
    }

    if let Some(selector) = selector("a[href]") {
        let mut seen = std::collections::HashSet::new();
        for anchor in document.select(&selector) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            if let Some(resolved) = resolve(base.as_ref(), href) {
                if seen.insert(resolved.clone()) {
                    page.links.push(resolved);
                }
            }
        }
    }

    if let Some(selector) = selector(r#"link[rel="stylesheet"]"#) {
        let mut seen = std::collections::HashSet::new();
        for link in document.select(&selector) {
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            if let Some(resolved) = resolve(base.as_ref(), href) {
                if seen.insert(resolved.clone()) {
                    page.css_links.push(resolved);
                }
            }
        }
    }

    if let Some(selector) = selector("style") {
        for style in document.select(&selector) {
            let css = style.text().collect::<String>();
            if !css.trim().is_empty() {
                page.inline_css.push(css);
            }
        }
    }

    if let Some(selector) = selector("meta") {
        for meta in document.select(&selector) {
            let value = meta.value();
            let name = value.attr("name").or_else(|| value.attr("property"));
            if let (Some(name), Some(content)) = (name, value.attr("content")) {
                page.meta.insert(name.to_string(), content.to_string());
            }
        }
    }

    page
}

fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            warn!("Invalid selector {css}: {e:?}");
            None
        }
    }
}

fn resolve(base: Option<&Url>, href: &str) -> Option<String> {
    let resolved = match base {
        Some(base) => base.join(href).ok()?,
        None => Url::parse(href).ok()?,
    };
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}
