use crate::config::MigrationConfig;
use crate::error::MigrateError;
use crate::images::asset_filename;
use crate::records::{ImageRef, ItemError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

/// One successfully resolved download
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadedAsset {
    /// Local filename under the images directory
    pub filename: String,
    /// Where it came from
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// Manifest of one fetch run: every attempted URL ends up either in
/// `assets` or in `errors`
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FetchReport {
    pub assets: Vec<DownloadedAsset>,
    pub errors: Vec<ItemError>,
    /// Duplicates and data:/empty URLs, skipped without error
    pub skipped: usize,
}

/// Downloads every discovered image into the destination directory.
///
/// Destination filenames derive deterministically from the URL path; two
/// URLs resolving to the same filename produce exactly one file and one
/// manifest entry. Items run in fixed-size batches where one failure never
/// cancels its siblings; a failed download leaves no partial file behind.
pub async fn fetch_all(
    refs: &[ImageRef],
    dest_dir: &Path,
    config: &MigrationConfig,
) -> Result<FetchReport, MigrateError> {
    std::fs::create_dir_all(dest_dir)?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.fetch_timeout_secs))
        .user_agent("site-porter/0.1")
        .build()
        .map_err(|e| MigrateError::Config {
            path: "http client".into(),
            message: e.to_string(),
        })?;

    let mut report = FetchReport::default();
    let mut claimed: BTreeSet<String> = BTreeSet::new();

    // Resolve filenames up front so batch members always target disjoint
    // paths
    let mut work: Vec<(ImageRef, String)> = Vec::new();
    for image in refs {
        let url = image.url.trim();
        if url.is_empty() || url.starts_with("data:") {
            report.skipped += 1;
            continue;
        }
        let filename = asset_filename(url)
            .unwrap_or_else(|| format!("image-{}", crate::short_hash(url)));
        if !claimed.insert(filename.clone()) {
            ::log::debug!("Duplicate destination {}, skipping {}", filename, url);
            report.skipped += 1;
            continue;
        }
        work.push((image.clone(), filename));
    }

    for chunk in work.chunks(config.batch_size.max(1)) {
        let downloads = chunk
            .iter()
            .map(|(image, filename)| download_one(&client, image, filename, dest_dir));
        for result in futures::future::join_all(downloads).await {
            match result {
                Ok(Some(asset)) => report.assets.push(asset),
                Ok(None) => report.skipped += 1,
                Err(error) => {
                    ::log::warn!("Failed to download {}: {}", error.identifier, error.message);
                    report.errors.push(error);
                }
            }
        }
        tokio::time::sleep(Duration::from_millis(config.batch_pause_ms)).await;
    }

    ::log::info!(
        "Image fetch done: {} downloaded, {} skipped, {} errors",
        report.assets.len(),
        report.skipped,
        report.errors.len()
    );
    Ok(report)
}

/// Download a single image. Ok(None) means the destination file already
/// existed from an earlier run.
async fn download_one(
    client: &reqwest::Client,
    image: &ImageRef,
    filename: &str,
    dest_dir: &Path,
) -> Result<Option<DownloadedAsset>, ItemError> {
    let target = dest_dir.join(filename);
    if target.exists() {
        ::log::debug!("Already downloaded: {}", filename);
        return Ok(None);
    }

    let item_error = |message: String| ItemError {
        identifier: image.url.clone(),
        message,
    };

    let response = client
        .get(&image.url)
        .send()
        .await
        .map_err(|e| item_error(e.to_string()))?;
    if !response.status().is_success() {
        return Err(item_error(format!("HTTP {}", response.status())));
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| item_error(e.to_string()))?;

    if let Err(e) = tokio::fs::write(&target, &bytes).await {
        // Never leave a truncated file where a download failed
        let _ = tokio::fs::remove_file(&target).await;
        return Err(item_error(e.to_string()));
    }

    Ok(Some(DownloadedAsset {
        filename: filename.to_string(),
        url: image.url.clone(),
        alt: image.alt.clone(),
        width: image.width,
        height: image.height,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::ImageRef;

    fn refs(urls: &[&str]) -> Vec<ImageRef> {
        urls.iter().map(|u| ImageRef::from_url(*u)).collect()
    }

    #[tokio::test]
    async fn data_and_empty_urls_are_skipped_without_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = MigrationConfig::new("https://example.com");
        let images = refs(&["", "data:image/png;base64,AAAA"]);

        let report = fetch_all(&images, tmp.path(), &config).await.unwrap();
        assert!(report.assets.is_empty());
        assert!(report.errors.is_empty());
        assert_eq!(report.skipped, 2);
    }

    #[tokio::test]
    async fn duplicate_destinations_collapse_to_one_attempt() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut config = MigrationConfig::new("https://example.com");
        config.batch_pause_ms = 0;
        // Both normalize to hero.jpg; pre-seeding the file makes the single
        // surviving attempt a no-network skip
        std::fs::write(tmp.path().join("hero.jpg"), b"cached").unwrap();
        let images = refs(&[
            "https://example.com/a/hero.jpg",
            "https://example.com/b/HERO.JPG",
        ]);

        let report = fetch_all(&images, tmp.path(), &config).await.unwrap();
        assert!(report.errors.is_empty());
        assert!(report.assets.is_empty());
        // one duplicate plus one already-present file
        assert_eq!(report.skipped, 2);
    }

    #[tokio::test]
    async fn existing_file_is_never_refetched() {
        let tmp = tempfile::TempDir::new().unwrap();
        let mut config = MigrationConfig::new("https://example.com");
        config.batch_pause_ms = 0;
        std::fs::write(tmp.path().join("logo.png"), b"old bytes").unwrap();

        let images = refs(&["https://example.com/img/logo.png"]);
        let report = fetch_all(&images, tmp.path(), &config).await.unwrap();
        assert_eq!(report.skipped, 1);
        assert_eq!(
            std::fs::read(tmp.path().join("logo.png")).unwrap(),
            b"old bytes"
        );
    }
}
