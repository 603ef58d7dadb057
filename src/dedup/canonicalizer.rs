//! URL canonicalization
//!
//! Every URL is reduced to a deterministic normal form before it is used as
//! an identity key anywhere in the crawler: scheme defaulted to https, host
//! lowercased with `www.` stripped, trailing slash removed from non-root
//! paths, tracking parameters dropped, remaining query parameters sorted,
//! fragment removed. Canonicalization is idempotent.

use std::collections::HashSet;

use log::warn;
use once_cell::sync::Lazy;
use url::Url;

/// Query parameters that never affect page identity.
static TRACKING_PARAMS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "utm_source", "utm_medium", "utm_campaign", "utm_term", "utm_content",
        "fbclid", "gclid", "msclkid", "ref", "referrer", "_ga", "_gid",
        "source", "campaign", "medium", "content", "term",
        "igshid", "ncid", "sr_share", "recruiter", "trk",
    ]
    .into_iter()
    .collect()
});

/// Reduce a raw URL to its canonical form.
///
/// Never fails: malformed input is returned lowercased and trimmed, with a
/// warning logged, so callers can always use the result as a key.
#[must_use]
pub fn canonicalize(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();

    match parse_with_default_scheme(&lowered) {
        Some(parsed) => build_canonical(&parsed),
        None => {
            warn!("Failed to canonicalize URL {raw}: not a parseable URL");
            lowered
        }
    }
}

/// Check whether two URLs share a canonical form.
#[must_use]
pub fn is_equivalent(a: &str, b: &str) -> bool {
    canonicalize(a) == canonicalize(b)
}

fn parse_with_default_scheme(lowered: &str) -> Option<Url> {
    match Url::parse(lowered) {
        Ok(parsed) if parsed.host_str().is_some() => Some(parsed),
        // Scheme-less input like "example.com/path" parses as a relative URL
        Ok(_) => None,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Url::parse(&format!("https://{lowered}")).ok()
        }
        Err(_) => None,
    }
}

fn build_canonical(parsed: &Url) -> String {
    let host = {
        let h = parsed.host_str().unwrap_or_default();
        if h.starts_with("www.") && h.len() > 4 {
            &h[4..]
        } else {
            h
        }
    };

    let path = {
        let trimmed = parsed.path().trim_end_matches('/');
        if trimmed.is_empty() { "/" } else { trimmed }
    };

    let query = canonical_query(parsed);

    let mut canonical = String::with_capacity(parsed.as_str().len());
    canonical.push_str(parsed.scheme());
    canonical.push_str("://");
    canonical.push_str(host);
    if let Some(port) = parsed.port() {
        canonical.push(':');
        canonical.push_str(&port.to_string());
    }
    canonical.push_str(path);
    if let Some(query) = query {
        canonical.push('?');
        canonical.push_str(&query);
    }

    canonical
}

fn canonical_query(parsed: &Url) -> Option<String> {
    parsed.query()?;

    // Drop blank values and tracking parameters, then sort by key for a
    // stable ordering. Values keep their relative order within a key.
    let mut pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, v)| !v.is_empty() && !TRACKING_PARAMS.contains(k.as_ref()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if pairs.is_empty() {
        return None;
    }

    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (k, v) in &pairs {
        serializer.append_pair(k, v);
    }
    Some(serializer.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_and_www_are_normalized() {
        assert_eq!(
            canonicalize("https://HTTPBIN.ORG/HTML"),
            canonicalize("https://httpbin.org/html")
        );
        assert_eq!(
            canonicalize("https://www.httpbin.org/html"),
            canonicalize("https://httpbin.org/html")
        );
    }

    #[test]
    fn test_tracking_params_and_fragment_are_dropped() {
        assert_eq!(
            canonicalize("https://httpbin.org/html?utm_source=x"),
            "https://httpbin.org/html"
        );
        assert_eq!(
            canonicalize("https://www.httpbin.org/html#frag"),
            "https://httpbin.org/html"
        );
        assert_eq!(
            canonicalize("https://a.test/p?fbclid=abc&id=2"),
            "https://a.test/p?id=2"
        );
    }

    #[test]
    fn test_query_params_are_sorted_and_blank_values_dropped() {
        assert_eq!(
            canonicalize("https://a.test/p?b=2&a=1"),
            canonicalize("https://a.test/p?a=1&b=2")
        );
        assert_eq!(canonicalize("https://a.test/p?a=&b=2"), "https://a.test/p?b=2");
    }

    #[test]
    fn test_trailing_slash_removed_except_root() {
        assert_eq!(canonicalize("https://a.test/path/"), "https://a.test/path");
        assert_eq!(canonicalize("https://a.test/"), "https://a.test/");
        assert_eq!(canonicalize("https://a.test"), "https://a.test/");
    }

    #[test]
    fn test_scheme_defaults_to_https() {
        assert_eq!(canonicalize("example.com/page"), "https://example.com/page");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "https://Example.com/Path/?utm_source=x&b=2&a=1#frag",
            "http://www.a.test:8080/x/",
            "a.test/y?q=term",
            "not a url at all",
        ];
        for raw in samples {
            let once = canonicalize(raw);
            assert_eq!(once, canonicalize(&once), "not idempotent for {raw}");
        }
    }

    #[test]
    fn test_malformed_input_returns_lowercased_trimmed() {
        assert_eq!(canonicalize("  ://Bad URL  "), "://bad url");
    }

    #[test]
    fn test_port_is_preserved() {
        assert_eq!(
            canonicalize("https://a.test:8443/page"),
            "https://a.test:8443/page"
        );
    }
}
