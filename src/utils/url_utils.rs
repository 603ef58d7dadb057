//! URL helpers shared across the crawler.

use url::Url;

/// Extract the host from a URL, lowercased with any `www.` prefix stripped.
///
/// Falls back to scanning the raw string when the URL does not parse, so
/// per-host bookkeeping still groups malformed inputs sensibly.
#[must_use]
pub fn extract_host(url: &str) -> String {
    if let Ok(parsed) = Url::parse(url) {
        if let Some(host) = parsed.host_str() {
            return strip_www(&host.to_lowercase()).to_string();
        }
    }

    let after_scheme = match url.find("://") {
        Some(idx) => &url[idx + 3..],
        None => url,
    };
    let end = after_scheme
        .find(['/', '?', '#'])
        .unwrap_or(after_scheme.len());
    strip_www(&after_scheme[..end].to_lowercase()).to_string()
}

fn strip_www(host: &str) -> &str {
    if host.starts_with("www.") && host.len() > 4 {
        &host[4..]
    } else {
        host
    }
}

/// Directory-safe form of a host: lowercased, `www.` stripped, `:` replaced.
#[must_use]
pub fn host_dir_name(url: &str) -> String {
    let mut host = extract_host(url);
    if let Ok(parsed) = Url::parse(url) {
        if let Some(port) = parsed.port() {
            host.push(':');
            host.push_str(&port.to_string());
        }
    }
    host.replace(':', "_")
}

/// 12-hex-character MD5 prefix of a URL, used as the page directory name.
#[must_use]
pub fn page_id(url: &str) -> String {
    format!("{:x}", md5::compute(url.as_bytes()))[..12].to_string()
}

/// Check if a URL is fetchable by this crawler.
#[must_use]
pub fn is_valid_url(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }

    // Skip data URLs, javascript URLs, and other non-http schemes
    if url.starts_with("data:") || url.starts_with("javascript:") || url.starts_with("mailto:") {
        return false;
    }

    match Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https"),
        Err(_) => false,
    }
}

/// Lowercased file extension of a URL path, empty string when there is none.
#[must_use]
pub fn file_extension(url: &str) -> String {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.to_string(),
    };
    let last_segment = path.rsplit('/').next().unwrap_or("");
    match last_segment.rfind('.') {
        Some(idx) if idx + 1 < last_segment.len() => {
            format!(".{}", last_segment[idx + 1..].to_lowercase())
        }
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_host() {
        assert_eq!(extract_host("https://example.com/path"), "example.com");
        assert_eq!(extract_host("https://WWW.Example.COM"), "example.com");
        assert_eq!(extract_host("https://sub.example.com:8080/x"), "sub.example.com");
        assert_eq!(extract_host("example.com/path"), "example.com");
    }

    #[test]
    fn test_host_dir_name_replaces_port_colon() {
        assert_eq!(host_dir_name("https://example.com:8443/x"), "example.com_8443");
        assert_eq!(host_dir_name("https://www.example.com/x"), "example.com");
    }

    #[test]
    fn test_page_id_is_stable_12_hex() {
        let id = page_id("https://example.com/");
        assert_eq!(id.len(), 12);
        assert_eq!(id, page_id("https://example.com/"));
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_is_valid_url() {
        assert!(is_valid_url("https://example.com"));
        assert!(is_valid_url("http://example.com/a?b=c"));
        assert!(!is_valid_url("javascript:void(0)"));
        assert!(!is_valid_url("mailto:a@b.c"));
        assert!(!is_valid_url("ftp://example.com"));
        assert!(!is_valid_url(""));
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("https://a.test/doc.PDF"), ".pdf");
        assert_eq!(file_extension("https://a.test/page.html?x=1"), ".html");
        assert_eq!(file_extension("https://a.test/dir/"), "");
        assert_eq!(file_extension("https://a.test/no-ext"), "");
    }
}
