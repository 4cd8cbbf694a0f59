use thiserror::Error;

/// Errors surfaced by the loading and reporting pipeline.
///
/// Empty query results and unparseable numeric cells are not errors: the
/// former come back as empty vectors, the latter as `None` values.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Required fields are missing after header canonicalization.
    #[error("schema error: missing required column(s): {}", .missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// A selector, window or range value that the pipeline does not accept.
    #[error("invalid option: {0}")]
    InvalidOption(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
