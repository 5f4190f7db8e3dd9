use crate::records::PageRecord;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;
use url::Url;

/// Content category for a migrated page. Mutually exclusive; assigned by
/// the first matching rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Page,
    Article,
    Service,
    About,
    Contact,
    Resource,
}

impl Category {
    /// Directory name for this category's documents
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Page => "page",
            Category::Article => "article",
            Category::Service => "service",
            Category::About => "about",
            Category::Contact => "contact",
            Category::Resource => "resource",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a crawled page was excluded from content generation.
/// These are deliberate audit entries, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Exclusion {
    AssetExtension,
    MediaUploadPath,
    TechnicalPath,
    ThinAssetPage,
    AssetLikeTitle,
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Exclusion::AssetExtension => "URL ends with an asset extension",
            Exclusion::MediaUploadPath => "URL points into a media upload path",
            Exclusion::TechnicalPath => "URL matches a technical/system path",
            Exclusion::ThinAssetPage => "near-empty page for an asset URL",
            Exclusion::AssetLikeTitle => "title looks like an asset filename",
        };
        f.write_str(reason)
    }
}

static ASSET_EXTENSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(jpg|jpeg|png|gif|webp|svg|ico|pdf|docx?|xlsx?|pptx?|zip|mp[34])/?$")
        .unwrap()
});

/// Asset extension anywhere in the URL, for attachment-style pages whose
/// path wraps a media filename ("/gallery/photo.jpg/view")
static EMBEDDED_ASSET_EXTENSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(jpg|jpeg|png|gif|webp|svg|ico|pdf|docx?|xlsx?|pptx?|zip|mp[34])([/?#]|$)")
        .unwrap()
});

static MEDIA_UPLOAD_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(wp-content/uploads|uploads|media)/").unwrap());

static TECHNICAL_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(/feed/?$|/rss/?$|sitemap[^/]*\.xml|/wp-admin|/wp-json|/xmlrpc\.php|[?&]attachment_id=|[?&]p=\d+.*preview|[?&]replytocom=)",
    )
    .unwrap()
});

static BARE_DIMENSIONS_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+x\d+$").unwrap());

static ASSET_TITLE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(jpg|jpeg|png|gif|webp|pdf|docx?)$").unwrap());

static CAMERA_FILENAME_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(img|dsc[nf]?|gopr|pano)[-_ ]?\d+").unwrap());

/// Localized generic photo names ("foto 3", "imagem-12", "photo2")
static GENERIC_PHOTO_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(foto|fotografia|imagem|image|photo)[-_ ]?\d*$").unwrap());

/// Decides whether a crawled page is content-worthy.
///
/// Checks run in a fixed order and the first match wins; every exclusion is
/// logged with its reason by the caller.
pub fn exclusion_for(record: &PageRecord) -> Option<Exclusion> {
    let url = record.url.as_str();

    if ASSET_EXTENSION.is_match(url) {
        return Some(Exclusion::AssetExtension);
    }
    if MEDIA_UPLOAD_PATH.is_match(url) {
        return Some(Exclusion::MediaUploadPath);
    }
    if TECHNICAL_PATH.is_match(url) {
        return Some(Exclusion::TechnicalPath);
    }
    if record.plain_text.trim().len() < 50 && EMBEDDED_ASSET_EXTENSION.is_match(url) {
        return Some(Exclusion::ThinAssetPage);
    }
    if let Some(title) = &record.title {
        let title = title.trim();
        if BARE_DIMENSIONS_TITLE.is_match(title)
            || ASSET_TITLE_SUFFIX.is_match(title)
            || CAMERA_FILENAME_TITLE.is_match(title)
            || GENERIC_PHOTO_TITLE.is_match(title)
        {
            return Some(Exclusion::AssetLikeTitle);
        }
    }
    None
}

/// Keyword rules for category assignment, checked in order.
/// Blog patterns come before contact patterns, so a URL carrying both
/// classifies as an article.
const CATEGORY_RULES: &[(Category, &[&str], &[&str])] = &[
    (
        Category::Article,
        &["/blog/", "/noticias/", "/news/", "/artigos/", "/post/"],
        &["artigo", "notícia"],
    ),
    (
        Category::Service,
        &["/servicos/", "/serviços/", "/services/", "/servico-", "/service-"],
        &["serviço", "servico", "service"],
    ),
    (
        Category::About,
        &["/sobre", "/about", "/quem-somos", "/equipa", "/team"],
        &["sobre ", "about "],
    ),
    (
        Category::Contact,
        &["/contacto", "/contato", "/contact"],
        &["contacto", "contato", "contact"],
    ),
    (
        Category::Resource,
        &["/recursos", "/resources", "/downloads", "/faq"],
        &[],
    ),
];

/// Assigns the category for a page from its URL and title.
/// First matching rule wins; pages matching nothing are plain pages.
pub fn categorize(url: &str, title: Option<&str>) -> Category {
    let url = url.to_lowercase();
    let title = title.map(str::to_lowercase).unwrap_or_default();

    for (category, url_needles, title_needles) in CATEGORY_RULES {
        let url_hit = url_needles.iter().any(|n| url.contains(n));
        let title_hit = title_needles.iter().any(|n| title.contains(n));
        if url_hit || title_hit {
            return *category;
        }
    }
    Category::Page
}

/// Derives a URL-safe slug from a page URL.
///
/// Any same-origin host form (www or apex, either scheme) reduces to the
/// URL's path; an empty path is the index page. Every run of characters
/// outside [a-z0-9-] collapses to a single hyphen, with leading/trailing
/// hyphens trimmed. Pure function: the same URL always yields the same slug.
pub fn slug_for(url: &str, base_url: &str) -> String {
    // The crawler admits www/apex variants as one origin, so records may
    // carry a host form that differs from the configured base URL
    let same_origin_path = match (Url::parse(url), Url::parse(base_url)) {
        (Ok(parsed), Ok(base))
            if crate::filter::normalize_host(&parsed) == crate::filter::normalize_host(&base) =>
        {
            Some(parsed.path().to_string())
        }
        _ => None,
    };
    let raw_path = same_origin_path
        .as_deref()
        .unwrap_or_else(|| url.strip_prefix(base_url).unwrap_or(url))
        .trim_matches('/');

    // Crawled URLs arrive percent-encoded; decode so accented paths slug
    // the same whether they came from a record or a raw string
    let path = percent_encoding::percent_decode_str(raw_path).decode_utf8_lossy();
    let path = path.trim_matches('/');

    if path.is_empty() {
        return "index".to_string();
    }

    let mut slug = String::with_capacity(path.len());
    let mut pending_hyphen = false;
    for c in path.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    if slug.is_empty() {
        "index".to_string()
    } else {
        slug
    }
}

/// Appends a short content-independent disambiguator when two distinct
/// source URLs collapse to the same slug, so neither output overwrites the
/// other. The first occurrence keeps the clean slug.
pub fn disambiguated_slug(slug: &str, source_url: &str) -> String {
    format!("{}-{}", slug, crate::short_hash(source_url))
}
