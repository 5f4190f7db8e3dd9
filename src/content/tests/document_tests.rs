use crate::config::MigrationConfig;
use crate::content::classify::Category;
use crate::content::{
    clean_description, clean_title, process_pages, synthesize_description,
};
use crate::records::{Heading, ImageRef, LinkRef, MetaFields, PageRecord};
use chrono::{TimeZone, Utc};

fn page(url: &str, title: Option<&str>, main_html: &str, plain_text: &str) -> PageRecord {
    PageRecord {
        url: url.to_string(),
        fetched_at: Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap(),
        title: title.map(String::from),
        meta: MetaFields::default(),
        headings: vec![Heading {
            level: 1,
            text: "Heading".to_string(),
        }],
        main_html: main_html.to_string(),
        plain_text: plain_text.to_string(),
        images: Vec::new(),
        links: Vec::new(),
    }
}

fn config() -> MigrationConfig {
    let mut config = MigrationConfig::new("https://example.com");
    config.site_name = "Example Co".to_string();
    config
}

#[test]
fn title_suffixes_are_stripped() {
    assert_eq!(clean_title("Our Services | Example Co", "Example Co"), "Our Services");
    assert_eq!(clean_title("Home - the best widgets", ""), "Home");
    assert_eq!(clean_title("Untouched title", "Example Co"), "Untouched title");
}

#[test]
fn descriptions_are_decoded_stripped_and_truncated() {
    let cleaned = clean_description("We make <strong>things</strong> &amp; fix stuff");
    assert_eq!(cleaned, "We make things & fix stuff");

    let noisy = clean_description(r#"Good text {"@type":"Organization"} class="hero" trailing"#);
    assert_eq!(noisy, "Good text trailing");

    let long = "word ".repeat(100);
    assert!(clean_description(&long).chars().count() <= 160);
}

#[test]
fn description_synthesis_takes_substantial_sentences() {
    let text = "Short. This first sentence is clearly long enough to keep. \
                And this second one also carries real information. A third is ignored entirely.";
    let synthesized = synthesize_description(text).unwrap();
    assert!(synthesized.starts_with("This first sentence"));
    assert!(synthesized.contains("second one"));
    assert!(!synthesized.contains("third"));

    assert_eq!(synthesize_description("Tiny. Bits."), None);
}

#[test]
fn frontmatter_renders_with_nested_seo_block() {
    let pages = vec![page(
        "https://example.com/sobre-nos",
        Some("Sobre Nós | Example Co"),
        "<p>A nossa história é longa e cheia de pormenores interessantes para contar.</p>",
        "A nossa história é longa e cheia de pormenores interessantes para contar.",
    )];
    let outcome = process_pages(&pages, &config()).unwrap();
    assert_eq!(outcome.documents.len(), 1);

    let rendered = outcome.documents[0].render();
    assert!(rendered.starts_with("---\n"));
    assert!(rendered.contains("title: \"Sobre Nós\"\n"));
    assert!(rendered.contains("publishDate: 2026-03-14\n"));
    assert!(rendered.contains("category: about\n"));
    assert!(rendered.contains("originalUrl: \"https://example.com/sobre-nos\"\n"));
    assert!(rendered.contains("slug: \"sobre-nos\"\n"));
    assert!(rendered.contains("seo:\n  title:"));
    assert!(rendered.contains("---\n\nA nossa história"));
}

#[test]
fn slug_collisions_get_a_disambiguating_suffix() {
    let body = "<p>Enough body text for a perfectly reasonable content page here.</p>";
    let text = "Enough body text for a perfectly reasonable content page here.";
    let pages = vec![
        page("https://example.com/a!b", Some("First"), body, text),
        page("https://example.com/a_b", Some("Second"), body, text),
    ];
    let outcome = process_pages(&pages, &config()).unwrap();
    assert_eq!(outcome.documents.len(), 2);

    let first = &outcome.documents[0].slug;
    let second = &outcome.documents[1].slug;
    assert_eq!(first, "a-b");
    assert!(second.starts_with("a-b-"), "got {second}");
    assert_ne!(first, second);
}

#[test]
fn three_page_site_end_to_end() {
    let body = "<p>Long enough main content for the classifier to find worthwhile.</p>";
    let text = "Long enough main content for the classifier to find worthwhile.";
    let pages = vec![
        page("https://example.com/", Some("Example Co"), body, text),
        {
            let mut article = page(
                "https://example.com/blog/first-post/",
                Some("First Post | Example Co"),
                body,
                text,
            );
            article.links.push(LinkRef {
                url: "https://example.com/".to_string(),
                text: "home".to_string(),
            });
            article
        },
        // Crawled via a direct hit; classified out as an asset
        page(
            "https://example.com/files/brochure.pdf",
            Some("Brochure"),
            "",
            "",
        ),
    ];

    let outcome = process_pages(&pages, &config()).unwrap();

    assert_eq!(outcome.documents.len(), 2);
    let categories: Vec<Category> = outcome.documents.iter().map(|d| d.category).collect();
    assert!(categories.contains(&Category::Page));
    assert!(categories.contains(&Category::Article));

    assert_eq!(outcome.excluded.len(), 1);
    assert!(outcome.excluded[0].url.ends_with(".pdf"));

    assert_eq!(outcome.redirects.len(), 2);
    let to_targets: Vec<&str> = outcome.redirects.iter().map(|r| r.to.as_str()).collect();
    assert!(to_targets.contains(&"/index"));
    assert!(to_targets.contains(&"/blog-first-post"));
    assert!(outcome.redirects.iter().all(|r| r.status == 301));
}

#[test]
fn page_image_references_survive_into_the_body() {
    let mut record = page(
        "https://example.com/equipa",
        Some("A Equipa"),
        r#"<p>Conheça a equipa.</p><img src="/wp-content/uploads/equipa.jpg">"#,
        "Conheça a equipa e descubra quem faz o trabalho todos os dias.",
    );
    record.images.push(ImageRef {
        url: "https://example.com/wp-content/uploads/equipa.jpg".to_string(),
        alt: None,
        width: Some(1200),
        height: Some(800),
    });

    let outcome = process_pages(&[record], &config()).unwrap();
    let body = &outcome.documents[0].body;
    assert!(body.contains("![Equipa](/images/content/equipa.jpg)"), "body: {body}");
}

#[test]
fn meta_description_wins_over_synthesis() {
    let mut record = page(
        "https://example.com/servicos/",
        Some("Serviços"),
        "<p>First sentence of the body that would otherwise be synthesized.</p>",
        "First sentence of the body that would otherwise be synthesized.",
    );
    record.meta.description = Some("Hand-written summary.".to_string());

    let outcome = process_pages(&[record], &config()).unwrap();
    assert_eq!(outcome.documents[0].frontmatter.description, "Hand-written summary.");
    assert_eq!(outcome.documents[0].category, Category::Service);
}
