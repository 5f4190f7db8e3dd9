use regex::Regex;
use url::Url;

/// Extensions that mark a URL as a binary/asset target, never crawled
const ASSET_EXTENSION_PATTERN: &str =
    r"(?i)\.(jpg|jpeg|png|gif|webp|svg|ico|css|js|woff2?|ttf|eot|pdf|docx?|xlsx?|pptx?|zip|rar|mp[34]|avi|mov)(\?.*)?$";

/// Technical/system paths that never produce content pages
const TECHNICAL_PATH_PATTERNS: &[&str] = &[
    r"/feed/?$",
    r"/rss/?$",
    r"sitemap.*\.xml",
    r"/wp-admin",
    r"/wp-json",
    r"/wp-login",
    r"/xmlrpc\.php",
    r"[?&]attachment_id=",
    r"[?&]p=\d+&preview",
    r"[?&]replytocom=",
];

/// Decides which candidate URLs belong to the crawl.
///
/// The origin test compares normalized hostnames against the start URL;
/// malformed URLs are treated as external and never enqueued.
#[derive(Debug)]
pub struct OriginFilter {
    origin_host: String,
    exclude_regexes: Vec<Regex>,
}

impl OriginFilter {
    /// Create a filter for the given start URL plus any extra exclude patterns
    pub fn new(start_url: &Url, extra_patterns: &[String]) -> Result<Self, regex::Error> {
        let origin_host = normalize_host(start_url);

        let mut exclude_regexes = vec![Regex::new(ASSET_EXTENSION_PATTERN)?];
        for pattern in TECHNICAL_PATH_PATTERNS {
            exclude_regexes.push(Regex::new(pattern)?);
        }
        for pattern in extra_patterns {
            exclude_regexes.push(Regex::new(pattern)?);
        }

        Ok(Self {
            origin_host,
            exclude_regexes,
        })
    }

    /// True if the candidate shares the start URL's origin.
    /// Strings that do not parse as absolute URLs are external.
    pub fn is_same_origin(&self, candidate: &str) -> bool {
        match Url::parse(candidate) {
            Ok(url) => normalize_host(&url) == self.origin_host,
            Err(_) => false,
        }
    }

    /// True if this URL should be fetched as a page
    pub fn should_crawl(&self, url: &Url) -> bool {
        if normalize_host(url) != self.origin_host {
            return false;
        }
        let url_str = url.as_str();
        !self.exclude_regexes.iter().any(|re| re.is_match(url_str))
    }

    /// Resolve a raw href against its page and normalize it for the visited
    /// set (fragment stripped). Returns None for malformed or non-http(s)
    /// references.
    pub fn resolve(&self, base: &Url, href: &str) -> Option<Url> {
        let href = href.trim();
        if href.is_empty() || href.starts_with("javascript:") || href.starts_with("mailto:") {
            return None;
        }
        let mut resolved = base.join(href).ok()?;
        if !matches!(resolved.scheme(), "http" | "https") {
            return None;
        }
        resolved.set_fragment(None);
        Some(resolved)
    }
}

/// Hostname lowered and with any leading "www." stripped, so that
/// www/apex variants of the same site count as one origin
pub(crate) fn normalize_host(url: &Url) -> String {
    let host = url.host_str().unwrap_or("").to_lowercase();
    host.strip_prefix("www.").unwrap_or(&host).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter_for(start: &str) -> OriginFilter {
        let url = Url::parse(start).unwrap();
        OriginFilter::new(&url, &[]).unwrap()
    }

    #[test]
    fn same_origin_matches_www_variant() {
        let filter = filter_for("https://example.com/");
        assert!(filter.is_same_origin("https://www.example.com/about"));
        assert!(filter.is_same_origin("http://example.com/contact"));
        assert!(!filter.is_same_origin("https://other.com/"));
    }

    #[test]
    fn malformed_urls_are_external() {
        let filter = filter_for("https://example.com/");
        assert!(!filter.is_same_origin("not a url"));
        assert!(!filter.is_same_origin("//missing-scheme.example.com"));
    }

    #[test]
    fn asset_extensions_are_not_crawled() {
        let filter = filter_for("https://example.com/");
        for path in [
            "/brochure.pdf",
            "/photo.JPG",
            "/styles.css?v=3",
            "/doc.docx",
        ] {
            let url = Url::parse(&format!("https://example.com{path}")).unwrap();
            assert!(!filter.should_crawl(&url), "{path} should be excluded");
        }
        let page = Url::parse("https://example.com/about").unwrap();
        assert!(filter.should_crawl(&page));
    }

    #[test]
    fn technical_paths_are_not_crawled() {
        let filter = filter_for("https://example.com/");
        for path in [
            "/feed/",
            "/sitemap_index.xml",
            "/wp-admin/options.php",
            "/?attachment_id=42",
        ] {
            let url = Url::parse(&format!("https://example.com{path}")).unwrap();
            assert!(!filter.should_crawl(&url), "{path} should be excluded");
        }
    }

    #[test]
    fn resolve_strips_fragments_and_rejects_schemes() {
        let filter = filter_for("https://example.com/");
        let base = Url::parse("https://example.com/blog/post").unwrap();

        let resolved = filter.resolve(&base, "../about#team").unwrap();
        assert_eq!(resolved.as_str(), "https://example.com/about");

        assert!(filter.resolve(&base, "javascript:void(0)").is_none());
        assert!(filter.resolve(&base, "mailto:info@example.com").is_none());
        assert!(filter.resolve(&base, "").is_none());
    }

    #[test]
    fn extra_patterns_extend_the_excludes() {
        let url = Url::parse("https://example.com/").unwrap();
        let filter = OriginFilter::new(&url, &[r"/drafts/".to_string()]).unwrap();
        let draft = Url::parse("https://example.com/drafts/wip").unwrap();
        assert!(!filter.should_crawl(&draft));
    }
}
