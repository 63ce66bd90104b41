use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("cannot write export to {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("nothing to export for contract {0}")]
    Empty(String),
}
