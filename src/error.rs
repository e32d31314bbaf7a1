use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum PipelineError {
    #[error("invalid species slug: {0}")]
    InvalidSlug(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("catalog request failed: {0}")]
    CatalogHttp(String),

    #[error("catalog returned status {status}: {message}")]
    CatalogStatus { status: u16, message: String },

    #[error("catalog row {line} has {found} fields, expected 4")]
    CatalogRow { line: usize, found: usize },

    #[error("species site request failed: {0}")]
    SiteHttp(String),

    #[error("species site returned status {status}: {message}")]
    SiteStatus { status: u16, message: String },

    #[error("corrupt archive: {0}")]
    BadArchive(String),

    #[error("failed to parse grid {path}: {message}")]
    GridParse { path: String, message: String },

    #[error("conversion failed for {path}: {message}")]
    Conversion { path: String, message: String },

    #[error("failed to assign CRS: {0}")]
    CrsAssignment(String),

    #[error("unrecognized polygon layer name: {0}")]
    LayerName(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("worker pool error: {0}")]
    Pool(String),
}
