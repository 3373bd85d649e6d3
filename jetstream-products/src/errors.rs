use jetstream_core::errors::JetstreamError;
use std::path::PathBuf;
use thiserror::Error;

/// Error type for data-product handling
#[derive(Error, Debug)]
pub enum ProductError {
    #[error(transparent)]
    Core(#[from] JetstreamError),
    #[error("Invalid subset: {0}")]
    InvalidSubset(String),
    #[error("Subset of {product} data selects no observations")]
    EmptySubset { product: &'static str },
    #[error("Could not read {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Could not parse run configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Convenience type for `Result<T, ProductError>`.
pub type ProductResult<T> = Result<T, ProductError>;
