use crate::error::MigrateError;
use crate::records::ItemError;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

/// One responsive width target. `width: None` is the untouched-dimensions
/// variant.
#[derive(Debug, Clone, Copy)]
pub struct SizeClass {
    pub width: Option<u32>,
    pub suffix: &'static str,
}

/// The fixed size-class ladder: sm/md/lg plus the original dimensions
pub const SIZE_CLASSES: &[SizeClass] = &[
    SizeClass {
        width: Some(400),
        suffix: "-sm",
    },
    SizeClass {
        width: Some(800),
        suffix: "-md",
    },
    SizeClass {
        width: Some(1200),
        suffix: "-lg",
    },
    SizeClass {
        width: None,
        suffix: "",
    },
];

/// Output encodings generated per size class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    WebP,
    Jpeg,
}

impl OutputFormat {
    fn extension(&self) -> &'static str {
        match self {
            OutputFormat::WebP => "webp",
            OutputFormat::Jpeg => "jpg",
        }
    }
}

/// Encoder settings for variant generation
#[derive(Debug, Clone, Copy)]
pub struct TranscodeConfig {
    pub jpeg_quality: u8,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self { jpeg_quality: 90 }
    }
}

/// What one transcoding pass did
#[derive(Debug, Default)]
pub struct TranscodeReport {
    /// Variant files actually written this run
    pub written: Vec<PathBuf>,
    /// Sources passed through as plain copies (undecodable or non-image)
    pub copied: Vec<PathBuf>,
    /// Variants skipped because their output was already fresh
    pub skipped_fresh: usize,
    /// Per-variant failures; never abort the remaining work
    pub errors: Vec<ItemError>,
}

impl TranscodeReport {
    /// Fold another pass's results into this one
    pub fn merge(&mut self, other: TranscodeReport) {
        self.written.extend(other.written);
        self.copied.extend(other.copied);
        self.skipped_fresh += other.skipped_fresh;
        self.errors.extend(other.errors);
    }
}

/// Walks a source tree and transcodes every image into the output tree,
/// mirroring the directory structure. Non-image files copy through
/// unchanged. Idempotent: a second run over an unchanged tree writes
/// nothing.
pub fn transcode_tree(
    source_dir: &Path,
    output_dir: &Path,
    config: &TranscodeConfig,
) -> Result<TranscodeReport, MigrateError> {
    if !source_dir.is_dir() {
        return Err(MigrateError::MissingInput {
            stage: "images",
            path: source_dir.to_path_buf(),
        });
    }

    let mut report = TranscodeReport::default();
    for entry in WalkDir::new(source_dir).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let source = entry.path();
        let relative_parent = source
            .parent()
            .and_then(|p| p.strip_prefix(source_dir).ok())
            .unwrap_or(Path::new(""));
        let target_dir = output_dir.join(relative_parent);
        fs::create_dir_all(&target_dir)?;

        if crate::images::has_image_extension(source) {
            report.merge(transcode_one(source, &target_dir, config));
        } else {
            match copy_through(source, &target_dir) {
                Ok(Some(copied)) => report.copied.push(copied),
                Ok(None) => report.skipped_fresh += 1,
                Err(e) => report.errors.push(ItemError {
                    identifier: source.display().to_string(),
                    message: e.to_string(),
                }),
            }
        }
    }

    ::log::info!(
        "Transcode done: {} written, {} copied, {} fresh, {} errors",
        report.written.len(),
        report.copied.len(),
        report.skipped_fresh,
        report.errors.len()
    );
    Ok(report)
}

/// Produces the size/format variant family for one source image.
///
/// Each variant is regenerated only when its output is missing or older
/// than the source. A failing variant is logged and the remaining ones are
/// still attempted. A source we cannot decode falls back to a byte-for-byte
/// copy with no derived variants.
pub fn transcode_one(source: &Path, output_dir: &Path, config: &TranscodeConfig) -> TranscodeReport {
    let mut report = TranscodeReport::default();

    let decoded = ImageReader::open(source)
        .map_err(|e| e.to_string())
        .and_then(|r| r.decode().map_err(|e| e.to_string()));
    let img = match decoded {
        Ok(img) => img,
        Err(message) => {
            // Codec cannot handle this file: keep the pipeline alive by
            // shipping the original bytes, explicitly unoptimized
            ::log::warn!("No optimization for {} ({})", source.display(), message);
            match copy_through(source, output_dir) {
                Ok(Some(copied)) => report.copied.push(copied),
                Ok(None) => report.skipped_fresh += 1,
                Err(e) => report.errors.push(ItemError {
                    identifier: source.display().to_string(),
                    message: e.to_string(),
                }),
            }
            return report;
        }
    };

    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");

    for size in SIZE_CLASSES {
        // Upscaling is forbidden: size classes wider than the source are
        // skipped, the original class always applies
        if let Some(target_width) = size.width {
            if img.width() <= target_width {
                continue;
            }
        }

        for format in [OutputFormat::WebP, OutputFormat::Jpeg] {
            let target = output_dir.join(format!("{stem}{}.{}", size.suffix, format.extension()));
            if is_fresh(source, &target) {
                report.skipped_fresh += 1;
                continue;
            }
            match write_variant(&img, size.width, format, &target, config) {
                Ok(()) => report.written.push(target),
                Err(message) => {
                    ::log::error!("Failed variant {}: {}", target.display(), message);
                    report.errors.push(ItemError {
                        identifier: target.display().to_string(),
                        message,
                    });
                }
            }
        }
    }

    report
}

/// The sole cache-invalidation rule: the output is fresh unless the source's
/// mtime is newer. No content hashing.
fn is_fresh(source: &Path, target: &Path) -> bool {
    let Ok(target_mtime) = fs::metadata(target).and_then(|m| m.modified()) else {
        return false;
    };
    let source_mtime = fs::metadata(source)
        .and_then(|m| m.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH);
    source_mtime <= target_mtime
}

/// Resize (fit inside, never upscale) and encode one variant, writing to a
/// temp file and renaming so a failure never corrupts a previous good output
fn write_variant(
    img: &DynamicImage,
    target_width: Option<u32>,
    format: OutputFormat,
    target: &Path,
    config: &TranscodeConfig,
) -> Result<(), String> {
    let resized;
    let output_img = match target_width {
        Some(width) if img.width() > width => {
            let height =
                ((width as u64 * img.height() as u64) / img.width() as u64).max(1) as u32;
            resized = img.resize(width, height, FilterType::Lanczos3);
            &resized
        }
        _ => img,
    };

    let tmp = target.with_extension(format!("{}.tmp", format.extension()));
    let result = encode_to(output_img, format, &tmp, config)
        .and_then(|()| fs::rename(&tmp, target).map_err(|e| e.to_string()));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn encode_to(
    img: &DynamicImage,
    format: OutputFormat,
    path: &Path,
    config: &TranscodeConfig,
) -> Result<(), String> {
    let file = fs::File::create(path).map_err(|e| e.to_string())?;
    let writer = BufWriter::new(file);
    match format {
        OutputFormat::WebP => img
            .write_with_encoder(WebPEncoder::new_lossless(writer))
            .map_err(|e| e.to_string()),
        OutputFormat::Jpeg => img
            .to_rgb8()
            .write_with_encoder(JpegEncoder::new_with_quality(writer, config.jpeg_quality))
            .map_err(|e| e.to_string()),
    }
}

/// Copy a file into the output directory unchanged, honoring the staleness
/// rule. Returns None when the existing copy is already fresh.
fn copy_through(source: &Path, output_dir: &Path) -> std::io::Result<Option<PathBuf>> {
    let name = source.file_name().unwrap_or_default();
    let target = output_dir.join(name);
    if is_fresh(source, &target) {
        return Ok(None);
    }
    let tmp = target.with_extension("copy.tmp");
    fs::copy(source, &tmp)?;
    fs::rename(&tmp, &target)?;
    Ok(Some(target))
}
