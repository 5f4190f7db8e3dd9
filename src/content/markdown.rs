use crate::content::classify::slug_for;
use crate::filter::OriginFilter;
use crate::images::asset_filename;
use regex::Regex;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use std::sync::LazyLock;
use url::Url;

/// Everything the converter needs to rewrite references while walking
pub struct RewriteContext<'a> {
    /// Same-origin test for link rewriting
    pub filter: &'a OriginFilter,
    /// Site base URL, for deriving slugs of link targets
    pub base_url: &'a str,
    /// URL of the page being converted; relative references resolve here
    pub page_url: &'a Url,
    /// Compiled non-content selectors; matching subtrees are dropped
    pub strip: &'a [Selector],
    /// Final slug per source URL, for targets that were themselves migrated
    pub slugs: &'a BTreeMap<String, String>,
}

/// Compile the configured strip selectors, warning on (and skipping) any
/// that do not parse
pub fn compile_strip_selectors(raw: &[String]) -> Vec<Selector> {
    raw.iter()
        .filter_map(|s| match Selector::parse(s) {
            Ok(sel) => Some(sel),
            Err(e) => {
                ::log::warn!("Skipping invalid strip selector '{}': {:?}", s, e);
                None
            }
        })
        .collect()
}

/// Converts a main-content HTML fragment to the portable document syntax.
///
/// This is a deliberately narrow converter over a real parse tree: a fixed
/// whitelist of tags (h1–h6, p, strong/b, em/i, br) becomes Markdown, image
/// and same-origin link references are rewritten, stripped regions are
/// dropped, and every other tag passes its text through unchanged.
pub fn convert_fragment(html: &str, ctx: &RewriteContext<'_>) -> String {
    let fragment = Html::parse_fragment(html);
    let mut out = String::with_capacity(html.len() / 2);
    render_children(fragment.root_element(), &mut out, ctx);
    collapse_blank_runs(&out)
}

fn render_children(el: ElementRef<'_>, out: &mut String, ctx: &RewriteContext<'_>) {
    for child in el.children() {
        match child.value() {
            Node::Text(text) => push_text(out, text),
            Node::Element(_) => {
                if let Some(child_ref) = ElementRef::wrap(child) {
                    render_element(child_ref, out, ctx);
                }
            }
            _ => {}
        }
    }
}

fn render_element(el: ElementRef<'_>, out: &mut String, ctx: &RewriteContext<'_>) {
    if ctx.strip.iter().any(|sel| sel.matches(&el)) {
        return;
    }

    match el.value().name() {
        name @ ("h1" | "h2" | "h3" | "h4" | "h5" | "h6") => {
            let level = name[1..].parse::<usize>().unwrap_or(1);
            let text = inline_text(el, ctx);
            if !text.is_empty() {
                out.push_str("\n\n");
                out.push_str(&"#".repeat(level));
                out.push(' ');
                out.push_str(&text);
                out.push_str("\n\n");
            }
        }
        "p" => {
            out.push_str("\n\n");
            render_children(el, out, ctx);
            out.push_str("\n\n");
        }
        "strong" | "b" => {
            let text = inline_text(el, ctx);
            if !text.is_empty() {
                out.push_str("**");
                out.push_str(&text);
                out.push_str("**");
            }
        }
        "em" | "i" => {
            let text = inline_text(el, ctx);
            if !text.is_empty() {
                out.push('*');
                out.push_str(&text);
                out.push('*');
            }
        }
        "br" => out.push('\n'),
        "img" => {
            if let Some(markdown) = rewrite_image(el, ctx) {
                out.push_str(&markdown);
            }
        }
        "a" => rewrite_link(el, out, ctx),
        // Unrecognized tags pass their content through unchanged
        _ => render_children(el, out, ctx),
    }
}

/// Rewrites an image reference to a relative asset path keyed by filename,
/// synthesizing alt text from the filename when the page provides none
fn rewrite_image(el: ElementRef<'_>, ctx: &RewriteContext<'_>) -> Option<String> {
    let src = el
        .value()
        .attr("src")
        .or_else(|| el.value().attr("data-src"))
        .or_else(|| el.value().attr("data-lazy-src"))?;
    if src.trim().is_empty() || src.starts_with("data:") {
        return None;
    }
    let absolute = ctx.page_url.join(src).ok()?;
    let filename = asset_filename(absolute.as_str())?;

    let alt = el
        .value()
        .attr("alt")
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(String::from)
        .unwrap_or_else(|| alt_from_filename(&filename));

    Some(format!("![{}](/images/content/{})", alt, filename))
}

/// Rewrites same-origin links to the slug path of their target; external
/// links keep their original URL
fn rewrite_link(el: ElementRef<'_>, out: &mut String, ctx: &RewriteContext<'_>) {
    let text = inline_text(el, ctx);
    let Some(href) = el.value().attr("href") else {
        out.push_str(&text);
        return;
    };
    let Some(resolved) = ctx.filter.resolve(ctx.page_url, href) else {
        out.push_str(&text);
        return;
    };

    if text.is_empty() {
        return;
    }

    if ctx.filter.is_same_origin(resolved.as_str()) {
        let slug = ctx
            .slugs
            .get(resolved.as_str())
            .cloned()
            .unwrap_or_else(|| slug_for(resolved.as_str(), ctx.base_url));
        let target = if slug == "index" {
            "/".to_string()
        } else {
            format!("/{slug}")
        };
        out.push_str(&format!("[{}]({})", text, target));
    } else {
        out.push_str(&format!("[{}]({})", text, resolved));
    }
}

/// Renders the inline content of an element (link/image rewrites included)
/// and normalizes it onto one line
fn inline_text(el: ElementRef<'_>, ctx: &RewriteContext<'_>) -> String {
    let mut buf = String::new();
    render_children(el, &mut buf, ctx);
    buf.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Push a text node, collapsing internal whitespace runs to single spaces
fn push_text(out: &mut String, text: &str) {
    if text.trim().is_empty() {
        if !out.ends_with(char::is_whitespace) && !out.is_empty() {
            out.push(' ');
        }
        return;
    }
    if text.starts_with(char::is_whitespace)
        && !out.ends_with(char::is_whitespace)
        && !out.is_empty()
    {
        out.push(' ');
    }
    out.push_str(&text.split_whitespace().collect::<Vec<_>>().join(" "));
    if text.ends_with(char::is_whitespace) {
        out.push(' ');
    }
}

static BLANK_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());
static TRAILING_LINE_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+\n").unwrap());
static LEADING_LINE_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n[ \t]+").unwrap());

/// Collapse 3+ consecutive line breaks to exactly 2 and trim stray
/// line-edge whitespace
pub fn collapse_blank_runs(text: &str) -> String {
    let text = TRAILING_LINE_SPACE.replace_all(text, "\n");
    let text = LEADING_LINE_SPACE.replace_all(&text, "\n");
    let text = BLANK_RUN.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Builds human-readable alt text from a filename: extension stripped,
/// separators turned into spaces, each word capitalized
pub fn alt_from_filename(filename: &str) -> String {
    let stem = filename
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(filename);

    stem.split(['-', '_', '.'])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
