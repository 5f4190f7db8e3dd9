//! Migrates a legacy website into a static-site content model.
//!
//! The pipeline crawls the site through a WebDriver-rendered browser,
//! classifies and normalizes each page into a frontmatter document,
//! downloads and transcodes referenced images into responsive variants,
//! and validates the produced artifacts.

pub mod config;
pub mod content;
pub mod crawler;
pub mod error;
pub mod filter;
pub mod images;
pub mod migrate;
pub mod records;
pub mod validate;

// Re-export commonly used types for convenience
pub use config::MigrationConfig;
pub use error::MigrateError;
pub use records::PageRecord;

use sha2::{Digest, Sha256};

/// Short stable hash of a string, used to disambiguate colliding slugs and
/// asset filenames. Eight hex characters is plenty for one site's URL space.
pub fn short_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest[..4].iter().map(|b| format!("{b:02x}")).collect()
}
