pub mod fetch;
pub mod transcode;

use url::Url;

/// Extensions treated as raster images by both the fetcher and transcoder
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Derives the local filename for an asset URL: the last path segment,
/// lowercased and sanitized to [a-z0-9._-]. Deterministic, so re-runs and
/// the markup rewriter agree on the same name. None when the URL has no
/// usable basename.
pub fn asset_filename(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let basename = parsed
        .path_segments()?
        .filter(|s| !s.is_empty())
        .next_back()?;
    let basename = percent_encoding::percent_decode_str(basename).decode_utf8_lossy();

    let sanitized: String = basename
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '-'
            }
        })
        .collect();

    let trimmed = sanitized.trim_matches('-');
    if trimmed.is_empty() || trimmed == "." {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// True if the path's extension names an image format we can decode
pub fn has_image_extension(path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn filename_is_last_path_segment_sanitized() {
        assert_eq!(
            asset_filename("https://example.com/wp-content/uploads/2023/Team Photo.JPG"),
            Some("team-photo.jpg".to_string())
        );
        assert_eq!(
            asset_filename("https://example.com/img/logo.png?v=3"),
            Some("logo.png".to_string())
        );
    }

    #[test]
    fn urls_without_basename_yield_none() {
        assert_eq!(asset_filename("https://example.com/"), None);
        assert_eq!(asset_filename("not a url"), None);
    }

    #[test]
    fn same_basename_normalizes_to_same_filename() {
        let a = asset_filename("https://example.com/a/hero.jpg").unwrap();
        let b = asset_filename("https://example.com/b/HERO.jpg").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn image_extension_check_is_case_insensitive() {
        assert!(has_image_extension(Path::new("photo.JPG")));
        assert!(has_image_extension(Path::new("a/b/pic.webp")));
        assert!(!has_image_extension(Path::new("doc.pdf")));
        assert!(!has_image_extension(Path::new("noext")));
    }
}
