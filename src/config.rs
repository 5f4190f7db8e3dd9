use crate::error::MigrateError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Configuration for one migration run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Base URL of the legacy site to migrate
    pub site_url: String,

    /// Human-readable site name, stripped from page-title suffixes
    #[serde(default)]
    pub site_name: String,

    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Root directory for all output artifacts
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,

    /// Directory of authored source images to transcode, in addition to the
    /// downloaded ones
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_images_dir: Option<PathBuf>,

    /// Number of pages/images processed concurrently per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause between batches, in milliseconds
    #[serde(default = "default_batch_pause_ms")]
    pub batch_pause_ms: u64,

    /// Per-item network timeout, in seconds (page fetch and image download)
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Settle delay after navigation, for dynamically rendered content
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Selector fallback chain for the main content region; first match wins
    #[serde(default = "default_content_selectors")]
    pub content_selectors: Vec<String>,

    /// Selectors removed from the content region before conversion
    #[serde(default = "default_strip_selectors")]
    pub strip_selectors: Vec<String>,

    /// Extra regex patterns for URLs to exclude from crawling
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
}

impl MigrationConfig {
    /// Create a configuration with default values for the given site
    pub fn new(site_url: &str) -> Self {
        Self {
            site_url: site_url.to_string(),
            site_name: String::new(),
            webdriver_url: default_webdriver_url(),
            output_root: default_output_root(),
            source_images_dir: None,
            batch_size: default_batch_size(),
            batch_pause_ms: default_batch_pause_ms(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            settle_delay_ms: default_settle_delay_ms(),
            content_selectors: default_content_selectors(),
            strip_selectors: default_strip_selectors(),
            exclude_patterns: Vec::new(),
        }
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, MigrateError> {
        let path = path.as_ref();
        let mut contents = String::new();
        File::open(path)
            .and_then(|mut f| f.read_to_string(&mut contents))
            .map_err(|e| MigrateError::Config {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let mut config: Self =
            serde_json::from_str(&contents).map_err(|e| MigrateError::Config {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Override the WebDriver URL from the environment if provided
    pub fn apply_env_overrides(&mut self) {
        if let Ok(webdriver_url) = std::env::var("WEBDRIVER_URL") {
            if !webdriver_url.is_empty() {
                self.webdriver_url = webdriver_url;
            }
        }
    }

    /// Directory holding crawl artifacts (page records, URL lists, summary)
    pub fn crawl_dir(&self) -> PathBuf {
        self.output_root.join("crawl")
    }

    /// Directory holding generated content documents
    pub fn content_dir(&self) -> PathBuf {
        self.output_root.join("content")
    }

    /// Directory holding downloaded source images
    pub fn images_dir(&self) -> PathBuf {
        self.output_root.join("images")
    }

    /// Directory holding transcoded image variants
    pub fn optimized_images_dir(&self) -> PathBuf {
        self.output_root.join("images-optimized")
    }
}

/// Default value for webdriver_url
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

/// Default output root directory
fn default_output_root() -> PathBuf {
    PathBuf::from("migration-output")
}

/// Default batch size for concurrent page/image processing
fn default_batch_size() -> usize {
    5
}

/// Default pause between batches
fn default_batch_pause_ms() -> u64 {
    1000
}

/// Default per-item network timeout
fn default_fetch_timeout_secs() -> u64 {
    30
}

/// Default settle delay after navigation
fn default_settle_delay_ms() -> u64 {
    2000
}

/// Default selector fallback chain for the main content region.
/// First match wins; the document body is the terminal fallback.
fn default_content_selectors() -> Vec<String> {
    [
        "main",
        "article",
        "#content",
        ".content",
        "#main",
        ".entry-content",
        ".post-content",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Default selectors stripped from the content region before conversion.
/// Configurable because the body fallback can pull in page chrome these
/// defaults do not anticipate.
fn default_strip_selectors() -> Vec<String> {
    [
        "script",
        "style",
        "noscript",
        "nav",
        "header",
        "footer",
        "aside",
        ".menu",
        ".nav",
        ".navigation",
        ".sidebar",
        ".widget",
        ".ad",
        ".ads",
        ".advertisement",
        ".social-share",
        ".share-buttons",
        ".breadcrumb",
        ".breadcrumbs",
        ".pagination",
        ".comments",
        "#comments",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config: MigrationConfig =
            serde_json::from_str(r#"{"site_url": "https://legacy.example.com"}"#).unwrap();
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.fetch_timeout_secs, 30);
        assert_eq!(config.webdriver_url, "http://localhost:4444");
        assert!(config.content_selectors.contains(&"main".to_string()));
        assert!(config.strip_selectors.contains(&"script".to_string()));
    }

    #[test]
    fn missing_config_file_is_a_stage_failure() {
        let result = MigrationConfig::from_file("/nonexistent/migration.json");
        assert!(matches!(result, Err(MigrateError::Config { .. })));
    }

    #[test]
    fn output_dirs_hang_off_the_root() {
        let mut config = MigrationConfig::new("https://legacy.example.com");
        config.output_root = PathBuf::from("/tmp/out");
        assert_eq!(config.crawl_dir(), PathBuf::from("/tmp/out/crawl"));
        assert_eq!(config.content_dir(), PathBuf::from("/tmp/out/content"));
        assert_eq!(
            config.optimized_images_dir(),
            PathBuf::from("/tmp/out/images-optimized")
        );
    }
}
