//! Structure-invariant content fingerprinting
//!
//! Hashes fetched bodies so that pages differing only in dynamic noise
//! (scripts, comments, CSRF tokens, whitespace) fingerprint identically.
//! The digest-to-first-URL map backs the duplicate-content decision.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::storage::ArtifactKind;

static COMMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<!--.*?-->").expect("hardcoded pattern compiles")
});

static SCRIPT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script\b.*?</script>").expect("hardcoded pattern compiles")
});

/// Patterns for values that change on every render without changing the page.
static DYNAMIC_TOKEN_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#"(?i)timestamp["']?\s*:\s*["']?\d+["']?"#,
        r#"(?i)_token["']?\s*:\s*["'][^"']+["']"#,
        r#"(?i)csrftoken["']?\s*:\s*["'][^"']+["']"#,
        r#"(?i)sessionid["']?\s*:\s*["'][^"']+["']"#,
    ]
    .iter()
    .map(|p| Regex::new(p).expect("hardcoded pattern compiles"))
    .collect()
});

static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("hardcoded pattern compiles"));

/// Maps content digests to the URL that first produced them.
#[derive(Debug, Default)]
pub struct ContentHasher {
    digest_to_first_url: HashMap<String, String>,
    url_to_digest: HashMap<String, String>,
}

impl ContentHasher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// SHA-256 hex digest of the body, normalized first when it is HTML.
    #[must_use]
    pub fn hash(&self, body: &str, kind: ArtifactKind) -> String {
        let normalized;
        let hashed = if kind == ArtifactKind::Html {
            normalized = normalize_html(body);
            normalized.as_str()
        } else {
            body
        };

        let digest = Sha256::digest(hashed.as_bytes());
        hex::encode(digest)
    }

    /// Record the body's digest and report whether it was seen before.
    ///
    /// On first sight the digest is stored against `url`; later sightings
    /// return the first URL and never overwrite the stored mapping.
    pub fn is_duplicate_content(
        &mut self,
        body: &str,
        url: &str,
        kind: ArtifactKind,
    ) -> (bool, Option<String>) {
        let digest = self.hash(body, kind);

        if let Some(first_url) = self.digest_to_first_url.get(&digest) {
            return (true, Some(first_url.clone()));
        }

        self.digest_to_first_url.insert(digest.clone(), url.to_string());
        self.url_to_digest.insert(url.to_string(), digest);
        (false, None)
    }

    /// Number of distinct content fingerprints seen.
    #[must_use]
    pub fn unique_hashes(&self) -> usize {
        self.digest_to_first_url.len()
    }

    /// Number of URLs whose content has been fingerprinted.
    #[must_use]
    pub fn urls_hashed(&self) -> usize {
        self.url_to_digest.len()
    }
}

/// Strip comments, scripts, and dynamic tokens, then collapse whitespace.
#[must_use]
pub fn normalize_html(html: &str) -> String {
    let mut normalized = COMMENT_RE.replace_all(html, "").into_owned();
    normalized = SCRIPT_RE.replace_all(&normalized, "").into_owned();
    for pattern in DYNAMIC_TOKEN_RES.iter() {
        normalized = pattern.replace_all(&normalized, "").into_owned();
    }
    WHITESPACE_RE.replace_all(&normalized, " ").trim().to_string()
}
