use crate::config::MigrationConfig;
use crate::content::markdown::{
    RewriteContext, alt_from_filename, collapse_blank_runs, compile_strip_selectors,
    convert_fragment,
};
use crate::filter::OriginFilter;
use scraper::Selector;
use std::collections::BTreeMap;
use url::Url;

struct Fixture {
    filter: OriginFilter,
    page_url: Url,
    strip: Vec<Selector>,
    slugs: BTreeMap<String, String>,
}

impl Fixture {
    fn new() -> Self {
        let start = Url::parse("https://example.com/").unwrap();
        let config = MigrationConfig::new("https://example.com");
        Self {
            filter: OriginFilter::new(&start, &[]).unwrap(),
            page_url: Url::parse("https://example.com/blog/post/").unwrap(),
            strip: compile_strip_selectors(&config.strip_selectors),
            slugs: BTreeMap::new(),
        }
    }

    fn convert(&self, html: &str) -> String {
        let ctx = RewriteContext {
            filter: &self.filter,
            base_url: "https://example.com",
            page_url: &self.page_url,
            strip: &self.strip,
            slugs: &self.slugs,
        };
        convert_fragment(html, &ctx)
    }
}

#[test]
fn headings_become_prefixed_lines() {
    let f = Fixture::new();
    let md = f.convert("<h1>Top</h1><h2>Sub</h2><h3>Deeper</h3>");
    assert_eq!(md, "# Top\n\n## Sub\n\n### Deeper");
}

#[test]
fn paragraphs_and_inline_emphasis() {
    let f = Fixture::new();
    let md = f.convert("<p>Plain and <strong>bold</strong> and <em>soft</em>.</p>");
    assert_eq!(md, "Plain and **bold** and *soft*.");
}

#[test]
fn b_and_i_aliases_convert_too() {
    let f = Fixture::new();
    let md = f.convert("<p><b>loud</b> <i>quiet</i></p>");
    assert_eq!(md, "**loud** *quiet*");
}

#[test]
fn br_becomes_a_line_break() {
    let f = Fixture::new();
    let md = f.convert("<p>line one<br>line two</p>");
    assert_eq!(md, "line one\nline two");
}

#[test]
fn unknown_tags_pass_their_text_through() {
    let f = Fixture::new();
    let md = f.convert("<section><blockquote>quoted words</blockquote></section>");
    assert_eq!(md, "quoted words");
}

#[test]
fn stripped_regions_disappear() {
    let f = Fixture::new();
    let md = f.convert(
        "<nav><a href=\"/\">Home</a></nav>\
         <p>real content</p>\
         <div class=\"sidebar\">widgets</div>\
         <footer>footer chrome</footer>",
    );
    assert_eq!(md, "real content");
}

#[test]
fn scripts_and_styles_never_leak_into_the_body() {
    let f = Fixture::new();
    let md = f.convert("<p>before</p><script>alert(1)</script><style>p{}</style><p>after</p>");
    assert_eq!(md, "before\n\nafter");
}

#[test]
fn images_are_rewritten_to_relative_asset_paths() {
    let f = Fixture::new();
    let md = f.convert(r#"<img src="/wp-content/uploads/2023/team.jpg" alt="The whole team">"#);
    assert_eq!(md, "![The whole team](/images/content/team.jpg)");
}

#[test]
fn lazy_loaded_images_are_rewritten_too() {
    let f = Fixture::new();
    let md = f.convert(r#"<img data-lazy-src="/uploads/slow-hero.jpg" alt="Hero">"#);
    assert_eq!(md, "![Hero](/images/content/slow-hero.jpg)");

    let md = f.convert(r#"<img data-src="/uploads/deferred.png" alt="Deferred">"#);
    assert_eq!(md, "![Deferred](/images/content/deferred.png)");
}

#[test]
fn missing_alt_is_synthesized_from_the_filename() {
    let f = Fixture::new();
    let md = f.convert(r#"<img src="/uploads/our-new-office.jpg">"#);
    assert_eq!(md, "![Our New Office](/images/content/our-new-office.jpg)");
}

#[test]
fn same_origin_links_point_at_the_target_slug() {
    let mut f = Fixture::new();
    f.slugs.insert(
        "https://example.com/sobre-nos".to_string(),
        "sobre-nos".to_string(),
    );
    let md = f.convert(r#"<p>Read <a href="/sobre-nos">about us</a>.</p>"#);
    assert_eq!(md, "Read [about us](/sobre-nos).");
}

#[test]
fn unmapped_same_origin_links_fall_back_to_the_derived_slug() {
    let f = Fixture::new();
    let md = f.convert(r#"<p><a href="https://example.com/Serviços/">services</a></p>"#);
    assert_eq!(md, "[services](/servi-os)");
}

#[test]
fn home_links_point_at_the_root() {
    let f = Fixture::new();
    let md = f.convert(r#"<p><a href="https://example.com/">home</a></p>"#);
    assert_eq!(md, "[home](/)");
}

#[test]
fn external_links_keep_their_url() {
    let f = Fixture::new();
    let md = f.convert(r#"<p><a href="https://other.org/page">ref</a></p>"#);
    assert_eq!(md, "[ref](https://other.org/page)");
}

#[test]
fn relative_links_resolve_against_the_page() {
    let f = Fixture::new();
    // page is /blog/post/, so ../other is /blog/other
    let md = f.convert(r#"<p><a href="../other">sibling</a></p>"#);
    assert_eq!(md, "[sibling](/blog-other)");
}

#[test]
fn blank_runs_collapse_to_one_empty_line() {
    assert_eq!(collapse_blank_runs("a\n\n\n\n\nb"), "a\n\nb");
    assert_eq!(collapse_blank_runs("a\n\nb"), "a\n\nb");
    assert_eq!(collapse_blank_runs("  a  \n\n\n  b  "), "a\n\nb");
}

#[test]
fn alt_synthesis_capitalizes_each_word() {
    assert_eq!(alt_from_filename("our-new_office.photo.jpg"), "Our New Office Photo");
    assert_eq!(alt_from_filename("logo.png"), "Logo");
    assert_eq!(alt_from_filename("noext"), "Noext");
}

#[test]
fn nested_markup_converts_in_document_order() {
    let f = Fixture::new();
    let md = f.convert(
        "<h2>Why us</h2><p>Because <strong>quality</strong> matters.</p><p>And price.</p>",
    );
    assert_eq!(md, "## Why us\n\nBecause **quality** matters.\n\nAnd price.");
}
