//! Typed errors for the ingestion and query core.
//!
//! File-level failures (`Io`, `Parse`, `Pattern`, `Walk`) abort the current
//! load call. Record-level shape problems never surface here: the normalizers
//! degrade them to absent fields instead. `Validation` is reserved for bad
//! caller input on the query side.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "failed to parse {}{}: {source}",
        path.display(),
        line.map(|l| format!(" (line {l})")).unwrap_or_default()
    )]
    Parse {
        path: PathBuf,
        /// 1-based physical line, set for line-delimited files only.
        line: Option<usize>,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid glob pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("failed to expand pattern '{pattern}': {source}")]
    Walk {
        pattern: String,
        #[source]
        source: walkdir::Error,
    },

    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },
}

impl CatalogError {
    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        CatalogError::Validation {
            field,
            message: message.into(),
        }
    }
}
