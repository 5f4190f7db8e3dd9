use crate::config::MigrationConfig;
use crate::content::{ContentDocument, ProcessOutcome, process_pages};
use crate::crawler;
use crate::error::MigrateError;
use crate::images::fetch::{FetchReport, fetch_all};
use crate::images::transcode::{TranscodeConfig, TranscodeReport, transcode_tree};
use crate::records::{CrawlOutcome, CrawlSummary, ImageRef, PageRecord, Redirect};
use crate::validate::{ValidationReport, validate};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::time::Instant;

/// Aggregate report for one full migration run
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub pages_crawled: usize,
    pub crawl_errors: usize,
    pub documents_written: usize,
    pub pages_excluded: usize,
    pub pages_by_category: BTreeMap<String, usize>,
    pub images_requested: usize,
    pub images_downloaded: usize,
    pub images_failed: usize,
    pub variants_written: usize,
    pub validation_errors: usize,
    pub validation_warnings: usize,
    pub elapsed_seconds: f64,
}

/// Crawl the site and persist the crawl artifacts
pub async fn run_crawl(config: &MigrationConfig) -> Result<CrawlOutcome, MigrateError> {
    let outcome = crawler::crawl(config).await?;

    let crawl_dir = config.crawl_dir();
    fs::create_dir_all(&crawl_dir)?;
    write_json(&crawl_dir.join("pages.json"), &outcome.pages, "pages")?;
    write_json(
        &crawl_dir.join("image-urls.json"),
        &collect_image_refs(&outcome),
        "image URL list",
    )?;
    write_json(
        &crawl_dir.join("summary.json"),
        &CrawlSummary::from_outcome(&outcome),
        "crawl summary",
    )?;
    write_json(&crawl_dir.join("errors.json"), &outcome.errors, "crawl errors")?;

    Ok(outcome)
}

/// Normalize previously crawled pages and persist documents and redirects
pub fn run_process(config: &MigrationConfig) -> Result<ProcessOutcome, MigrateError> {
    let pages: Vec<PageRecord> = read_json(&config.crawl_dir().join("pages.json"), "process")?;
    process_and_write(&pages, config)
}

/// Download discovered images and regenerate the variant families
pub async fn run_images(
    config: &MigrationConfig,
) -> Result<(FetchReport, TranscodeReport), MigrateError> {
    let refs: Vec<ImageRef> = read_json(&config.crawl_dir().join("image-urls.json"), "images")?;
    fetch_and_transcode(&refs, config).await
}

/// Run every stage in order. Any stage-level failure aborts the run; the
/// caller maps the error to a non-zero exit status.
pub async fn run_full(config: &MigrationConfig) -> Result<RunSummary, MigrateError> {
    let started = Instant::now();

    let outcome = run_crawl(config).await?;
    let processed = process_and_write(&outcome.pages, config)?;
    let image_refs = collect_image_refs(&outcome);
    let (fetched, transcoded) = fetch_and_transcode(&image_refs, config).await?;

    let downloaded = downloaded_filenames(&config.images_dir())?;
    let validation = validate(&processed.documents, &downloaded);
    write_json(
        &config.output_root.join("validation-report.json"),
        &validation,
        "validation report",
    )?;

    let summary = build_summary(
        &outcome,
        &processed,
        image_refs.len(),
        &fetched,
        &transcoded,
        &validation,
        started,
    );
    write_json(&config.output_root.join("summary.json"), &summary, "run summary")?;
    Ok(summary)
}

fn process_and_write(
    pages: &[PageRecord],
    config: &MigrationConfig,
) -> Result<ProcessOutcome, MigrateError> {
    let outcome = process_pages(pages, config)?;

    write_documents(&outcome.documents, &config.content_dir())?;
    write_redirects(&outcome.redirects, &config.output_root)?;
    write_json(
        &config.output_root.join("excluded-pages.json"),
        &outcome.excluded,
        "exclusion audit",
    )?;
    Ok(outcome)
}

async fn fetch_and_transcode(
    refs: &[ImageRef],
    config: &MigrationConfig,
) -> Result<(FetchReport, TranscodeReport), MigrateError> {
    let images_dir = config.images_dir();
    let fetched = fetch_all(refs, &images_dir, config).await?;
    write_json(
        &config.output_root.join("image-manifest.json"),
        &fetched,
        "image manifest",
    )?;

    let transcode_config = TranscodeConfig::default();
    let mut transcoded = TranscodeReport::default();
    if images_dir.is_dir() {
        transcoded.merge(transcode_tree(
            &images_dir,
            &config.optimized_images_dir(),
            &transcode_config,
        )?);
    }
    if let Some(authored) = &config.source_images_dir {
        transcoded.merge(transcode_tree(
            authored,
            &config.optimized_images_dir(),
            &transcode_config,
        )?);
    }
    Ok((fetched, transcoded))
}

/// One document file per qualifying page, under its category subdirectory
fn write_documents(documents: &[ContentDocument], content_dir: &Path) -> Result<(), MigrateError> {
    for doc in documents {
        let path = content_dir.join(doc.relative_path());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, doc.render())?;
        ::log::debug!("Wrote {}", path.display());
    }
    Ok(())
}

/// Redirect mapping in both JSON and flattened static-host form
fn write_redirects(redirects: &[Redirect], output_root: &Path) -> Result<(), MigrateError> {
    fs::create_dir_all(output_root)?;
    write_json(&output_root.join("redirects.json"), &redirects, "redirects")?;
    let flattened: String = redirects
        .iter()
        .map(|r| r.as_line() + "\n")
        .collect();
    fs::write(output_root.join("_redirects"), flattened)?;
    Ok(())
}

/// Merge every page's normalized image references into one flat list,
/// first occurrence of a URL wins (it carries the alt text)
fn collect_image_refs(outcome: &CrawlOutcome) -> Vec<ImageRef> {
    let mut seen = BTreeSet::new();
    let mut refs = Vec::new();
    for page in &outcome.pages {
        for image in &page.images {
            if seen.insert(image.url.clone()) {
                refs.push(image.clone());
            }
        }
    }
    // URLs discovered outside page records (og:image and friends)
    for url in &outcome.image_urls {
        if seen.insert(url.clone()) {
            refs.push(ImageRef::from_url(url.clone()));
        }
    }
    refs
}

fn downloaded_filenames(images_dir: &Path) -> Result<BTreeSet<String>, MigrateError> {
    let mut names = BTreeSet::new();
    if images_dir.is_dir() {
        for entry in fs::read_dir(images_dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                names.insert(entry.file_name().to_string_lossy().into_owned());
            }
        }
    }
    Ok(names)
}

fn build_summary(
    outcome: &CrawlOutcome,
    processed: &ProcessOutcome,
    images_requested: usize,
    fetched: &FetchReport,
    transcoded: &TranscodeReport,
    validation: &ValidationReport,
    started: Instant,
) -> RunSummary {
    RunSummary {
        pages_crawled: outcome.pages.len(),
        crawl_errors: outcome.errors.len(),
        documents_written: processed.documents.len(),
        pages_excluded: processed.excluded.len(),
        pages_by_category: processed.category_counts(),
        images_requested,
        images_downloaded: fetched.assets.len(),
        images_failed: fetched.errors.len(),
        variants_written: transcoded.written.len(),
        validation_errors: validation.error_count(),
        validation_warnings: validation.warning_count(),
        elapsed_seconds: started.elapsed().as_secs_f64(),
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T, artifact: &str) -> Result<(), MigrateError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| MigrateError::serialize(artifact, e))?;
    fs::write(path, json)?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path, stage: &'static str) -> Result<T, MigrateError> {
    if !path.is_file() {
        return Err(MigrateError::MissingInput {
            stage,
            path: path.to_path_buf(),
        });
    }
    let contents = fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| MigrateError::serialize(path.display().to_string(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{ItemError, MetaFields};
    use chrono::Utc;

    fn page(url: &str) -> PageRecord {
        PageRecord {
            url: url.to_string(),
            fetched_at: Utc::now(),
            title: None,
            meta: MetaFields::default(),
            headings: Vec::new(),
            main_html: String::new(),
            plain_text: String::new(),
            images: vec![ImageRef {
                url: "https://example.com/uploads/shared.jpg".to_string(),
                alt: Some("Shared".to_string()),
                width: None,
                height: None,
            }],
            links: Vec::new(),
        }
    }

    #[test]
    fn image_refs_deduplicate_across_pages() {
        let mut outcome = CrawlOutcome {
            pages: vec![page("https://example.com/a"), page("https://example.com/b")],
            image_urls: BTreeSet::new(),
            errors: Vec::new(),
        };
        outcome
            .image_urls
            .insert("https://example.com/uploads/other.png".to_string());
        outcome
            .image_urls
            .insert("https://example.com/uploads/shared.jpg".to_string());

        let refs = collect_image_refs(&outcome);
        assert_eq!(refs.len(), 2);
        // first occurrence keeps its alt text
        let shared = refs
            .iter()
            .find(|r| r.url.ends_with("shared.jpg"))
            .unwrap();
        assert_eq!(shared.alt.as_deref(), Some("Shared"));
    }

    #[test]
    fn missing_crawl_store_fails_the_process_stage() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut config = MigrationConfig::new("https://example.com");
        config.output_root = tmp.path().to_path_buf();
        let result = run_process(&config);
        assert!(matches!(result, Err(MigrateError::MissingInput { stage: "process", .. })));
    }

    #[test]
    fn redirect_files_are_written_in_both_forms() {
        let tmp = tempfile::TempDir::new().unwrap();
        let redirects = vec![
            Redirect::permanent("/old-about", "/about"),
            Redirect::permanent("/servicos/", "/servicos"),
        ];
        write_redirects(&redirects, tmp.path()).unwrap();

        let flat = fs::read_to_string(tmp.path().join("_redirects")).unwrap();
        assert_eq!(flat, "/old-about /about 301\n/servicos/ /servicos 301\n");
        let parsed: Vec<Redirect> =
            serde_json::from_str(&fs::read_to_string(tmp.path().join("redirects.json")).unwrap())
                .unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].status, 301);
    }

    #[test]
    fn crawl_errors_do_not_block_artifact_write() {
        let outcome = CrawlOutcome {
            pages: vec![page("https://example.com/")],
            image_urls: BTreeSet::new(),
            errors: vec![ItemError {
                identifier: "https://example.com/broken".to_string(),
                message: "timed out after 30s".to_string(),
            }],
        };
        let summary = CrawlSummary::from_outcome(&outcome);
        assert_eq!(summary.pages_crawled, 1);
        assert_eq!(summary.errors, 1);
    }
}
