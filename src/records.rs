use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One crawled page. Created when the page is first fetched and immutable
/// for the rest of the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRecord {
    /// Canonical absolute URL; the unique key for the run
    pub url: String,

    /// When the page was fetched
    pub fetched_at: DateTime<Utc>,

    /// Page title (if available)
    pub title: Option<String>,

    /// Named metadata extracted from the head
    pub meta: MetaFields,

    /// Ordered h1–h3 headings
    pub headings: Vec<Heading>,

    /// Raw HTML of the detected main content region
    pub main_html: String,

    /// Whitespace-normalized text of the main content region
    pub plain_text: String,

    /// Images referenced by the page, normalized to one shape
    pub images: Vec<ImageRef>,

    /// Outbound links discovered on the page
    pub links: Vec<LinkRef>,
}

/// Head metadata for one page
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetaFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub og_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub og_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub og_image: Option<String>,
}

/// A heading with its level (1–3)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Heading {
    pub level: u8,
    pub text: String,
}

/// One image reference, normalized at the extraction boundary.
///
/// Source pages carry image data in several shapes (bare src strings,
/// elements with partial attributes); everything downstream sees only this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl ImageRef {
    /// Normalize a bare URL into the tagged shape
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            alt: None,
            width: None,
            height: None,
        }
    }
}

/// One outbound link
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkRef {
    pub url: String,
    pub text: String,
}

/// A failure scoped to a single item; never aborts the run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemError {
    /// URL or path identifying the failed item
    pub identifier: String,
    pub message: String,
}

/// Everything one crawl invocation accumulates.
///
/// Threaded through the traversal rather than living as ambient state;
/// flushed to the crawl artifacts at run end and then discarded.
#[derive(Debug, Default)]
pub struct CrawlVisitState {
    /// URLs visited (or claimed for visiting) this run
    pub visited: BTreeSet<String>,
    /// Every same-origin link discovered so far; superset of visited
    pub discovered_links: BTreeSet<String>,
    /// Every image URL discovered so far
    pub discovered_images: BTreeSet<String>,
    /// Per-page failures, in occurrence order
    pub errors: Vec<ItemError>,
}

impl CrawlVisitState {
    /// Compute the current frontier: discovered same-origin links not yet
    /// visited. Traversal terminates when this is empty, because `visited`
    /// only grows and `discovered_links` is an accumulator.
    pub fn frontier(&self) -> Vec<String> {
        self.discovered_links
            .iter()
            .filter(|u| !self.visited.contains(*u))
            .cloned()
            .collect()
    }

    /// Claim a URL for visiting. Returns false if it was already claimed,
    /// which prevents duplicate fetches under concurrent batches.
    pub fn claim(&mut self, url: &str) -> bool {
        self.visited.insert(url.to_string())
    }

    /// Return a claimed URL to the frontier. Used when a claim could not be
    /// serviced this batch, so the URL is fetched later instead of lost.
    pub fn release(&mut self, url: &str) {
        self.visited.remove(url);
    }
}

/// Result of one crawl run
#[derive(Debug, Default)]
pub struct CrawlOutcome {
    /// Page records in discovery order
    pub pages: Vec<PageRecord>,
    /// All image URLs discovered across the site
    pub image_urls: BTreeSet<String>,
    /// Per-page failures
    pub errors: Vec<ItemError>,
}

/// Summary written alongside the page-record store
#[derive(Debug, Serialize, Deserialize)]
pub struct CrawlSummary {
    pub pages_crawled: usize,
    pub images_discovered: usize,
    pub errors: usize,
    pub average_text_chars: usize,
    pub crawled_at: DateTime<Utc>,
}

impl CrawlSummary {
    pub fn from_outcome(outcome: &CrawlOutcome) -> Self {
        let total_text: usize = outcome.pages.iter().map(|p| p.plain_text.len()).sum();
        let average_text_chars = if outcome.pages.is_empty() {
            0
        } else {
            total_text / outcome.pages.len()
        };
        Self {
            pages_crawled: outcome.pages.len(),
            images_discovered: outcome.image_urls.len(),
            errors: outcome.errors.len(),
            average_text_chars,
            crawled_at: Utc::now(),
        }
    }
}

/// One redirect from a legacy path to its migrated slug
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Redirect {
    pub from: String,
    pub to: String,
    pub status: u16,
}

impl Redirect {
    pub fn permanent(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            status: 301,
        }
    }

    /// Flattened line for static-host redirect files
    pub fn as_line(&self) -> String {
        format!("{} {} {}", self.from, self.to, self.status)
    }
}
