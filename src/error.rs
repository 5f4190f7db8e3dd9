use std::path::PathBuf;
use thiserror::Error;

/// Stage-level fatal errors.
///
/// Item-level failures (one page, one image) never use this type: they are
/// logged and collected into the aggregate error lists of each stage report.
#[derive(Debug, Error)]
pub enum MigrateError {
    #[error("failed to read configuration {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("missing required input for stage '{stage}': {path}")]
    MissingInput { stage: &'static str, path: PathBuf },

    #[error("could not connect to any WebDriver server (tried {attempted})")]
    WebDriverUnavailable { attempted: String },

    #[error("invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to serialize {artifact}: {source}")]
    Serialize {
        artifact: String,
        #[source]
        source: serde_json::Error,
    },
}

impl MigrateError {
    /// Wrap a serde_json error with the artifact it was produced for
    pub fn serialize(artifact: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialize {
            artifact: artifact.into(),
            source,
        }
    }
}
