use crate::content::ContentDocument;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Minimum body length before a document is flagged as suspiciously short
const SHORT_BODY_CHARS: usize = 200;

/// One structural problem found after generation. Reported, never
/// auto-fixed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// Slug of the document the finding is about
    pub slug: String,
    pub message: String,
}

/// Post-migration validation report
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<Finding>,
    pub warnings: Vec<Finding>,
}

impl ValidationReport {
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

static IMAGE_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[[^\]]*\]\(/images/content/([^)]+)\)").unwrap());

// the leading alternation keeps image syntax out while still matching a
// link at the very start of the body
static INTERNAL_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^!])\[[^\]]*\]\(/([^)/][^)]*)\)").unwrap());

/// Checks generated documents against the downloaded image set and each
/// other: missing descriptions, dangling image references, suspiciously
/// short bodies, and an estimate of broken internal links.
pub fn validate(documents: &[ContentDocument], downloaded_images: &BTreeSet<String>) -> ValidationReport {
    let slugs: BTreeSet<&str> = documents.iter().map(|d| d.slug.as_str()).collect();
    let mut report = ValidationReport::default();

    for doc in documents {
        if doc.frontmatter.description.is_empty() {
            report.warnings.push(Finding {
                slug: doc.slug.clone(),
                message: "missing description".to_string(),
            });
        }

        if doc.body.chars().count() < SHORT_BODY_CHARS {
            report.warnings.push(Finding {
                slug: doc.slug.clone(),
                message: format!(
                    "suspiciously short body ({} chars)",
                    doc.body.chars().count()
                ),
            });
        }

        for capture in IMAGE_REF.captures_iter(&doc.body) {
            let filename = &capture[1];
            if !downloaded_images.contains(filename) {
                report.errors.push(Finding {
                    slug: doc.slug.clone(),
                    message: format!("references missing image {filename}"),
                });
            }
        }

        for capture in INTERNAL_LINK.captures_iter(&doc.body) {
            let target = capture[1].trim_end_matches('/');
            if target.starts_with("images/") {
                continue;
            }
            if !slugs.contains(target) {
                report.warnings.push(Finding {
                    slug: doc.slug.clone(),
                    message: format!("internal link to ungenerated page /{target}"),
                });
            }
        }
    }

    ::log::info!(
        "Validation found {} errors, {} warnings",
        report.error_count(),
        report.warning_count()
    );
    report
}
