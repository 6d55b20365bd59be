use crate::stations::error::CatalogError;
use crate::types::product::Product;
use crate::types::window::Chunk;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single request against the data service.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to parse CSV response from {url}")]
    CsvParse {
        url: String,
        #[source]
        source: PolarsError,
    },

    #[error("Service rejected {url}: {message}")]
    Service { url: String, message: String },

    #[error("Giving up after {attempts} attempts")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<FetchError>,
    },
}

impl FetchError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::NetworkRequest(..) | FetchError::CsvParse { .. } => true,
            FetchError::HttpStatus { status, .. } => is_transient_status(*status),
            FetchError::Service { .. } | FetchError::RetriesExhausted { .. } => false,
        }
    }
}

/// Any non-success status is worth another attempt; the service answers
/// request problems it can diagnose with an `Error:` body instead.
pub(crate) fn is_transient_status(status: reqwest::StatusCode) -> bool {
    !status.is_success()
}

#[derive(Debug, Error)]
pub enum TideDataError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Chunk {chunk} of {product} for station {station} failed")]
    ChunkFailed {
        product: Product,
        station: String,
        chunk: Chunk,
        #[source]
        source: FetchError,
    },

    #[error("All {attempted} chunks of {product} for station {station} failed")]
    StitchFailed {
        product: Product,
        station: String,
        attempted: usize,
    },

    #[error("No {product} data was returned for station {station}")]
    NoData { product: Product, station: String },

    #[error("Missing required column '{column}' in {product} data for station {station}")]
    MissingColumn {
        product: Product,
        station: String,
        column: String,
    },

    #[error("Polars operation failed: {0}")]
    Polars(#[from] PolarsError),

    #[error("Failed to create cache directory '{0}'")]
    CacheDirCreation(PathBuf, #[source] std::io::Error),

    #[error("I/O error writing parquet cache file '{0}'")]
    ParquetWriteIo(PathBuf, #[source] std::io::Error),

    #[error("Encoding error writing parquet cache file '{0}'")]
    ParquetWritePolars(PathBuf, #[source] PolarsError),

    #[error("Failed to read parquet cache file '{0}'")]
    ParquetRead(PathBuf, #[source] PolarsError),

    #[error("Failed to open cache file '{0}'")]
    CacheOpen(PathBuf, #[source] std::io::Error),

    #[error("Failed to delete cache '{0}'")]
    CacheDeletion(PathBuf, #[source] std::io::Error),

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
