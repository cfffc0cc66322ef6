//! Error types for the webhelp2pdf pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Leftover printed pages from an earlier run would desynchronize numbering
    #[error(
        "found {count} leftover PDF file(s) in {}; clean them out manually so pages can be numbered properly",
        .dir.display()
    )]
    StaleDownloads { dir: PathBuf, count: usize },

    #[error(
        "PDF count in {} ({found}) does not match expected count of {expected}",
        .dir.display()
    )]
    CountMismatch {
        found: usize,
        expected: usize,
        dir: PathBuf,
    },

    /// A print must leave exactly one file behind, or later pages land in the wrong slot
    #[error("printing {url} left {found} file(s) in the download directory instead of one")]
    DownloadCount { url: String, found: usize },

    #[error(
        "collected files in {} are not numbered 1..={expected}: position {position} holds {found}",
        .dir.display()
    )]
    SequenceGap {
        position: usize,
        found: usize,
        expected: usize,
        dir: PathBuf,
    },

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("No document version label found on {0}")]
    MissingVersion(String),

    #[error("Invalid selector {0}")]
    Selector(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
