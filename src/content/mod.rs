pub mod classify;
pub mod markdown;

#[cfg(test)]
mod tests;

use crate::config::MigrationConfig;
use crate::error::MigrateError;
use crate::filter::OriginFilter;
use crate::records::{PageRecord, Redirect};
use classify::{Category, Exclusion, categorize, disambiguated_slug, exclusion_for, slug_for};
use markdown::{RewriteContext, compile_strip_selectors, convert_fragment};
use regex::Regex;
use scraper::Html;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::LazyLock;
use url::Url;

/// Maximum description length carried into frontmatter
const DESCRIPTION_LIMIT: usize = 160;

/// Nested SEO block of a document's frontmatter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Seo {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical: Option<String>,
}

/// Structured metadata block prefixed to a document's body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frontmatter {
    pub title: String,
    pub description: String,
    pub publish_date: String,
    pub category: Category,
    pub original_url: String,
    pub slug: String,
    pub seo: Seo,
}

/// One normalized output unit, derived 1:1 from a content-worthy page.
/// Written once to the content store and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentDocument {
    pub slug: String,
    pub category: Category,
    pub frontmatter: Frontmatter,
    pub body: String,
}

impl ContentDocument {
    /// Path of this document under the content store, relative to its root
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(self.category.as_str()).join(format!("{}.md", self.slug))
    }

    /// Render the full document: YAML frontmatter block followed by the body
    pub fn render(&self) -> String {
        let fm = &self.frontmatter;
        let mut out = String::new();
        out.push_str("---\n");
        out.push_str(&format!("title: {}\n", yaml_quote(&fm.title)));
        out.push_str(&format!("description: {}\n", yaml_quote(&fm.description)));
        out.push_str(&format!("publishDate: {}\n", fm.publish_date));
        out.push_str(&format!("category: {}\n", fm.category));
        out.push_str(&format!("originalUrl: {}\n", yaml_quote(&fm.original_url)));
        out.push_str(&format!("slug: {}\n", yaml_quote(&fm.slug)));
        out.push_str("seo:\n");
        out.push_str(&format!("  title: {}\n", yaml_quote(&fm.seo.title)));
        out.push_str(&format!("  description: {}\n", yaml_quote(&fm.seo.description)));
        if let Some(canonical) = &fm.seo.canonical {
            out.push_str(&format!("  canonical: {}\n", yaml_quote(canonical)));
        }
        out.push_str("---\n\n");
        out.push_str(&self.body);
        out.push('\n');
        out
    }
}

/// A page deliberately left out of content generation, with its reason
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExcludedPage {
    pub url: String,
    pub reason: Exclusion,
}

/// Result of normalizing one crawl's pages
#[derive(Debug, Default)]
pub struct ProcessOutcome {
    pub documents: Vec<ContentDocument>,
    pub excluded: Vec<ExcludedPage>,
    pub redirects: Vec<Redirect>,
}

impl ProcessOutcome {
    /// Document counts per category, for the run summary
    pub fn category_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for doc in &self.documents {
            *counts.entry(doc.category.to_string()).or_insert(0) += 1;
        }
        counts
    }
}

/// Classifies and normalizes every crawled page.
///
/// Exclusions are logged with their reason; a processing error for one page
/// is logged and skipped, never aborting the rest. Slug collisions across
/// distinct source URLs get a disambiguating suffix so no document silently
/// overwrites another.
pub fn process_pages(
    pages: &[PageRecord],
    config: &MigrationConfig,
) -> Result<ProcessOutcome, MigrateError> {
    let base_url = config.site_url.trim_end_matches('/');
    let start_url = Url::parse(&config.site_url).map_err(|e| MigrateError::InvalidUrl {
        url: config.site_url.clone(),
        message: e.to_string(),
    })?;
    let filter =
        OriginFilter::new(&start_url, &config.exclude_patterns).map_err(|e| {
            MigrateError::Config {
                path: "exclude_patterns".into(),
                message: e.to_string(),
            }
        })?;
    let strip = compile_strip_selectors(&config.strip_selectors);

    let mut outcome = ProcessOutcome::default();

    // First pass: decide content-worthiness and fix every slug up front,
    // so link rewriting can target final (collision-resolved) slugs
    let mut worthy: Vec<&PageRecord> = Vec::new();
    let mut slugs: BTreeMap<String, String> = BTreeMap::new();
    let mut used: BTreeSet<String> = BTreeSet::new();
    for record in pages {
        if let Some(reason) = exclusion_for(record) {
            ::log::debug!("Excluding {}: {}", record.url, reason);
            outcome.excluded.push(ExcludedPage {
                url: record.url.clone(),
                reason,
            });
            continue;
        }
        let mut slug = slug_for(&record.url, base_url);
        if !used.insert(slug.clone()) {
            slug = disambiguated_slug(&slug, &record.url);
            ::log::warn!("Slug collision for {}; using {}", record.url, slug);
            used.insert(slug.clone());
        }
        slugs.insert(record.url.clone(), slug);
        worthy.push(record);
    }

    for record in worthy {
        match build_document(record, config, &filter, &strip, &slugs, base_url) {
            Ok(doc) => {
                if let Some(redirect) = redirect_for(record, &doc.slug) {
                    outcome.redirects.push(redirect);
                }
                outcome.documents.push(doc);
            }
            Err(message) => {
                ::log::error!("Failed to process {}: {}", record.url, message);
            }
        }
    }

    ::log::info!(
        "Processed {} documents, excluded {} pages",
        outcome.documents.len(),
        outcome.excluded.len()
    );
    Ok(outcome)
}

fn build_document(
    record: &PageRecord,
    config: &MigrationConfig,
    filter: &OriginFilter,
    strip: &[scraper::Selector],
    slugs: &BTreeMap<String, String>,
    base_url: &str,
) -> Result<ContentDocument, String> {
    let page_url = Url::parse(&record.url).map_err(|e| e.to_string())?;
    let slug = slugs
        .get(&record.url)
        .cloned()
        .ok_or("slug was not assigned")?;

    let ctx = RewriteContext {
        filter,
        base_url,
        page_url: &page_url,
        strip,
        slugs,
    };
    let body = convert_fragment(&record.main_html, &ctx);

    let category = categorize(&record.url, record.title.as_deref());
    let title = record
        .title
        .as_deref()
        .map(|t| clean_title(t, &config.site_name))
        .filter(|t| !t.is_empty())
        .or_else(|| record.headings.first().map(|h| h.text.clone()))
        .unwrap_or_else(|| slug.clone());

    let description = record
        .meta
        .description
        .as_deref()
        .or(record.meta.og_description.as_deref())
        .map(clean_description)
        .filter(|d| !d.is_empty())
        .or_else(|| synthesize_description(&record.plain_text))
        .unwrap_or_default();

    let seo = Seo {
        title: record
            .meta
            .og_title
            .as_deref()
            .map(|t| clean_title(t, &config.site_name))
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| title.clone()),
        description: description.clone(),
        canonical: record.meta.canonical.clone(),
    };

    Ok(ContentDocument {
        slug: slug.clone(),
        category,
        frontmatter: Frontmatter {
            title,
            description,
            publish_date: record.fetched_at.format("%Y-%m-%d").to_string(),
            category,
            original_url: record.url.clone(),
            slug,
            seo,
        },
        body,
    })
}

/// One 301 from the legacy path to the migrated slug path.
/// Every migrated page gets a record; true self-redirects are dropped.
fn redirect_for(record: &PageRecord, slug: &str) -> Option<Redirect> {
    let from = Url::parse(&record.url).ok()?.path().to_string();
    let to = format!("/{slug}");
    if from == to {
        return None;
    }
    Some(Redirect::permanent(from, to))
}

/// Strips trailing "| site-name" / "- tagline" decorations from a title
pub fn clean_title(raw: &str, site_name: &str) -> String {
    let mut title = raw.trim();
    // Exact site-name suffix first, whatever separator precedes it
    if !site_name.is_empty() {
        if let Some(head) = title.strip_suffix(site_name) {
            title = head.trim_end().trim_end_matches(['|', '-', '–']).trim_end();
        }
    }
    let title = title.split(" | ").next().unwrap_or(title).trim();
    let title = title.split(" - ").next().unwrap_or(title).trim();
    title.to_string()
}

static JSON_LIKE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{[^{}]*\}").unwrap());
static ATTR_LIKE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"[\w-]+="[^"]*""#).unwrap());

/// Cleans a raw meta description: entity-decode and strip tags through a
/// real fragment parse, drop JSON-like and attribute-like fragments left by
/// broken page builders, collapse whitespace, truncate
pub fn clean_description(raw: &str) -> String {
    let fragment = Html::parse_fragment(raw);
    let text = fragment
        .root_element()
        .text()
        .collect::<Vec<_>>()
        .join(" ");
    let text = JSON_LIKE.replace_all(&text, " ");
    let text = ATTR_LIKE.replace_all(&text, " ");
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    truncate_chars(&collapsed, DESCRIPTION_LIMIT)
}

/// Synthesizes a description from the first one-to-two substantial
/// sentences of the body text
pub fn synthesize_description(plain_text: &str) -> Option<String> {
    let sentences: Vec<&str> = plain_text
        .split_inclusive(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| s.len() > 20)
        .take(2)
        .collect();
    if sentences.is_empty() {
        return None;
    }
    Some(truncate_chars(&sentences.join(" "), DESCRIPTION_LIMIT))
}

/// Truncate to at most `limit` characters, on a character boundary
fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    text.chars().take(limit).collect::<String>().trim_end().to_string()
}

/// Double-quoted YAML scalar with the two characters that need escaping
fn yaml_quote(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}
