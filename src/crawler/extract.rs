use crate::filter::OriginFilter;
use crate::records::{Heading, ImageRef, LinkRef, MetaFields, PageRecord};
use chrono::Utc;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Builds a PageRecord from the rendered HTML of one page.
///
/// Purely synchronous: the parse tree never lives across a suspension point.
pub fn extract_page(
    url: &Url,
    html: &str,
    content_selectors: &[String],
    filter: &OriginFilter,
) -> PageRecord {
    let doc = Html::parse_document(html);

    let title = select_text(&doc, "title");
    let meta = extract_meta(&doc);
    let headings = extract_headings(&doc);
    let main = select_main_region(&doc, content_selectors);
    let main_html = main.map(|el| el.inner_html()).unwrap_or_default();
    let plain_text = main.map(element_text).unwrap_or_default();
    let images = extract_images(&doc, url);
    let links = extract_links(&doc, url, filter);

    PageRecord {
        url: url.to_string(),
        fetched_at: Utc::now(),
        title,
        meta,
        headings,
        main_html,
        plain_text,
        images,
        links,
    }
}

/// Selects the main content region by trying each configured selector in
/// order. First match wins and regions are never merged; the document body
/// is the terminal fallback.
fn select_main_region<'a>(doc: &'a Html, content_selectors: &[String]) -> Option<ElementRef<'a>> {
    for raw in content_selectors {
        let Ok(selector) = Selector::parse(raw) else {
            ::log::warn!("Skipping invalid content selector: {}", raw);
            continue;
        };
        if let Some(element) = doc.select(&selector).next() {
            ::log::debug!("Main region matched selector: {}", raw);
            return Some(element);
        }
    }
    let body = Selector::parse("body").unwrap();
    doc.select(&body).next()
}

fn extract_meta(doc: &Html) -> MetaFields {
    MetaFields {
        description: meta_content(doc, r#"meta[name="description"]"#),
        keywords: meta_content(doc, r#"meta[name="keywords"]"#),
        canonical: attr_of(doc, r#"link[rel="canonical"]"#, "href"),
        og_title: meta_content(doc, r#"meta[property="og:title"]"#),
        og_description: meta_content(doc, r#"meta[property="og:description"]"#),
        og_image: meta_content(doc, r#"meta[property="og:image"]"#),
    }
}

fn extract_headings(doc: &Html) -> Vec<Heading> {
    let selector = Selector::parse("h1, h2, h3").unwrap();
    doc.select(&selector)
        .filter_map(|el| {
            let level = match el.value().name() {
                "h1" => 1,
                "h2" => 2,
                "h3" => 3,
                _ => return None,
            };
            let text = element_text(el);
            if text.is_empty() {
                None
            } else {
                Some(Heading { level, text })
            }
        })
        .collect()
}

/// Collects `<img>` references in document order, resolved to absolute URLs
/// and normalized into the single tagged shape downstream code expects.
fn extract_images(doc: &Html, base: &Url) -> Vec<ImageRef> {
    let selector = Selector::parse("img").unwrap();
    doc.select(&selector)
        .filter_map(|el| {
            // Lazy-loading themes park the real URL in data attributes
            let src = el
                .value()
                .attr("src")
                .or_else(|| el.value().attr("data-src"))
                .or_else(|| el.value().attr("data-lazy-src"))?;
            if src.trim().is_empty() || src.starts_with("data:") {
                return None;
            }
            let absolute = base.join(src).ok()?;
            Some(ImageRef {
                url: absolute.to_string(),
                alt: el
                    .value()
                    .attr("alt")
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .map(String::from),
                width: parse_dimension(el.value().attr("width")),
                height: parse_dimension(el.value().attr("height")),
            })
        })
        .collect()
}

fn extract_links(doc: &Html, base: &Url, filter: &OriginFilter) -> Vec<LinkRef> {
    let selector = Selector::parse("a").unwrap();
    doc.select(&selector)
        .filter_map(|el| {
            let href = el.value().attr("href")?;
            let resolved = filter.resolve(base, href)?;
            Some(LinkRef {
                url: resolved.to_string(),
                text: element_text(el),
            })
        })
        .collect()
}

/// Whitespace-normalized text of an element subtree
fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn select_text(doc: &Html, raw: &str) -> Option<String> {
    let selector = Selector::parse(raw).ok()?;
    doc.select(&selector)
        .next()
        .map(element_text)
        .filter(|t| !t.is_empty())
}

fn meta_content(doc: &Html, raw: &str) -> Option<String> {
    attr_of(doc, raw, "content")
}

fn attr_of(doc: &Html, raw: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(raw).ok()?;
    doc.select(&selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

fn parse_dimension(raw: Option<&str>) -> Option<u32> {
    raw.and_then(|v| v.trim().parse().ok())
}
